//! Layered configuration.
//!
//! # Resolution order
//!
//! ```text
//! built-in defaults
//!   < <home>/.fleetsync/config.yaml   (or an explicit --config path)
//!     < process environment           (a .env file is loaded into it first)
//! ```
//!
//! # API pattern
//!
//! - `load_at(home, …)`: explicit home; used in tests with `TempDir`
//! - `load(…)`: derives home from `dirs::home_dir()`, delegates to `load_at`
//! - `from_layers(file, env)`: pure merge, no I/O
//!
//! Nothing here fails because a key is absent. The per-service accessors
//! ([`Settings::mainwp`], [`Settings::notion`], …) report
//! [`ConfigError::Missing`] only for the keys the caller actually needs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com/api/v4";
pub const DEFAULT_VIRTUALMIN_PORT: u16 = 10000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

// ---------------------------------------------------------------------------
// 1. File layer
// ---------------------------------------------------------------------------

/// Shape of `config.yaml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub mainwp: MainWpFile,
    pub notion: NotionFile,
    pub gitlab: GitLabFile,
    pub virtualmin: VirtualminFile,
    pub poll: PollFile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MainWpFile {
    pub dashboard_url: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotionFile {
    pub api_key: Option<String>,
    pub domains_database_id: Option<String>,
    pub repos_database_id: Option<String>,
    pub api_url: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitLabFile {
    pub token: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VirtualminFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub accept_invalid_certs: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollFile {
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// `<home>/.fleetsync/config.yaml`, pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".fleetsync").join("config.yaml")
}

/// Read a config file. A missing file is an empty [`FileSettings`].
pub fn read_file(path: &Path) -> Result<FileSettings, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file");
        return Ok(FileSettings::default());
    }
    read_explicit_file(path)
}

/// Read a config file named on the command line. It must exist.
pub fn read_explicit_file(path: &Path) -> Result<FileSettings, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(FileSettings::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// 2. Resolved settings
// ---------------------------------------------------------------------------

/// Fully merged configuration; service views are validated on access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    mainwp_url: Option<String>,
    mainwp_key: Option<String>,
    mainwp_secret: Option<String>,
    notion_key: Option<String>,
    notion_domains_db: Option<String>,
    notion_repos_db: Option<String>,
    notion_api_url: String,
    notion_version: String,
    gitlab_token: Option<String>,
    gitlab_api_url: String,
    virtualmin_host: Option<String>,
    virtualmin_port: u16,
    virtualmin_url: Option<String>,
    virtualmin_username: Option<String>,
    virtualmin_password: Option<String>,
    virtualmin_insecure: bool,
    poll: PollSettings,
}

/// Which Notion database a pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingDatabase {
    /// Live domains and their MainWP status (`NOTION_DATABASE_ID`).
    Domains,
    /// GitLab repositories and their last commit (`NOTION_DATABASE_GIT_ID`).
    Repos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainWpSettings {
    pub dashboard_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionSettings {
    pub api_key: String,
    pub api_url: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLabSettings {
    pub token: String,
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualminSettings {
    /// Full `remote.cgi` endpoint.
    pub url: String,
    pub username: String,
    pub password: String,
    pub accept_invalid_certs: bool,
}

/// Fixed-interval poll used while waiting for a site update to land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl Settings {
    /// Load `<home>/.fleetsync/config.yaml` (or `explicit_file`) and overlay
    /// the process environment.
    pub fn load_at(home: &Path, explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit_file {
            Some(path) => read_explicit_file(path)?,
            None => read_file(&config_path_at(home))?,
        };
        Self::from_layers(file, |key| std::env::var(key).ok())
    }

    /// `load_at` convenience wrapper.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit_file {
            Some(path) => {
                let file = read_explicit_file(path)?;
                Self::from_layers(file, |key| std::env::var(key).ok())
            }
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
                Self::load_at(&home, None)
            }
        }
    }

    /// Merge a parsed file with an environment lookup. Empty env values
    /// count as unset.
    pub fn from_layers<F>(file: FileSettings, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let pick = |key: &str, fallback: Option<String>| var(key).or(fallback);

        let virtualmin_port = match var("VIRTUALMIN_PORT") {
            Some(raw) => parse_number::<u16>("VIRTUALMIN_PORT", &raw)?,
            None => file.virtualmin.port.unwrap_or(DEFAULT_VIRTUALMIN_PORT),
        };
        let virtualmin_insecure = match var("VIRTUALMIN_ACCEPT_INVALID_CERTS") {
            Some(raw) => parse_bool("VIRTUALMIN_ACCEPT_INVALID_CERTS", &raw)?,
            None => file.virtualmin.accept_invalid_certs.unwrap_or(true),
        };
        let interval_secs = match var("FLEETSYNC_POLL_INTERVAL_SECS") {
            Some(raw) => parse_number::<u64>("FLEETSYNC_POLL_INTERVAL_SECS", &raw)?,
            None => file
                .poll
                .interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL.as_secs()),
        };
        let timeout_secs = match var("FLEETSYNC_POLL_TIMEOUT_SECS") {
            Some(raw) => parse_number::<u64>("FLEETSYNC_POLL_TIMEOUT_SECS", &raw)?,
            None => file
                .poll
                .timeout_secs
                .unwrap_or(DEFAULT_POLL_TIMEOUT.as_secs()),
        };
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "FLEETSYNC_POLL_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "poll interval must be at least one second".to_string(),
            });
        }

        Ok(Self {
            mainwp_url: pick("MAINWP_DASHBOARD_URL", file.mainwp.dashboard_url),
            mainwp_key: pick("WP_MANAGE_CONSUMER_KEY", file.mainwp.consumer_key),
            mainwp_secret: pick("WP_MANAGE_SECRET_KEY", file.mainwp.consumer_secret),
            notion_key: pick("NOTION_API_KEY", file.notion.api_key),
            notion_domains_db: pick("NOTION_DATABASE_ID", file.notion.domains_database_id),
            notion_repos_db: pick("NOTION_DATABASE_GIT_ID", file.notion.repos_database_id),
            notion_api_url: pick("NOTION_API_URL", file.notion.api_url)
                .unwrap_or_else(|| DEFAULT_NOTION_API_URL.to_string()),
            notion_version: pick("NOTION_VERSION", file.notion.version)
                .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            gitlab_token: pick("GITLAB_TOKEN", file.gitlab.token),
            gitlab_api_url: pick("GITLAB_API_URL", file.gitlab.api_url)
                .unwrap_or_else(|| DEFAULT_GITLAB_API_URL.to_string()),
            virtualmin_host: pick("SERVER_IP", file.virtualmin.host),
            virtualmin_port,
            virtualmin_url: pick("VIRTUALMIN_URL", file.virtualmin.url),
            virtualmin_username: pick("LIVE_SERVER_USERNAME", file.virtualmin.username),
            virtualmin_password: pick("LIVE_SERVER_PASSWORD", file.virtualmin.password),
            virtualmin_insecure,
            poll: PollSettings {
                interval: Duration::from_secs(interval_secs),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }

    pub fn mainwp(&self) -> Result<MainWpSettings, ConfigError> {
        Ok(MainWpSettings {
            dashboard_url: trim_base(require(&self.mainwp_url, "MAINWP_DASHBOARD_URL")?),
            consumer_key: require(&self.mainwp_key, "WP_MANAGE_CONSUMER_KEY")?,
            consumer_secret: require(&self.mainwp_secret, "WP_MANAGE_SECRET_KEY")?,
        })
    }

    pub fn notion(&self) -> Result<NotionSettings, ConfigError> {
        Ok(NotionSettings {
            api_key: require(&self.notion_key, "NOTION_API_KEY")?,
            api_url: trim_base(self.notion_api_url.clone()),
            version: self.notion_version.clone(),
        })
    }

    /// Raw (possibly undashed) database id for a tracking database.
    pub fn notion_database(&self, which: TrackingDatabase) -> Result<String, ConfigError> {
        match which {
            TrackingDatabase::Domains => require(&self.notion_domains_db, "NOTION_DATABASE_ID"),
            TrackingDatabase::Repos => require(&self.notion_repos_db, "NOTION_DATABASE_GIT_ID"),
        }
    }

    pub fn gitlab(&self) -> Result<GitLabSettings, ConfigError> {
        Ok(GitLabSettings {
            token: require(&self.gitlab_token, "GITLAB_TOKEN")?,
            api_url: trim_base(self.gitlab_api_url.clone()),
        })
    }

    /// `VIRTUALMIN_URL` wins; otherwise the URL is built from `SERVER_IP`
    /// and the port.
    pub fn virtualmin(&self) -> Result<VirtualminSettings, ConfigError> {
        let url = match &self.virtualmin_url {
            Some(url) => url.clone(),
            None => {
                let host = require(&self.virtualmin_host, "SERVER_IP")?;
                format!(
                    "https://{host}:{}/virtual-server/remote.cgi",
                    self.virtualmin_port
                )
            }
        };
        Ok(VirtualminSettings {
            url,
            username: require(&self.virtualmin_username, "LIVE_SERVER_USERNAME")?,
            password: require(&self.virtualmin_password, "LIVE_SERVER_PASSWORD")?,
            accept_invalid_certs: self.virtualmin_insecure,
        })
    }

    pub fn poll(&self) -> PollSettings {
        self.poll
    }
}

fn require(value: &Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value.clone().ok_or(ConfigError::Missing { key })
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected one of true/false/yes/no/1/0".to_string(),
        }),
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
