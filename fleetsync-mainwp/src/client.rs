//! MainWP REST client.
//!
//! Every endpoint authenticates with `consumer_key` / `consumer_secret`
//! query parameters; [`fleetsync_core::HttpClient`] strips them from any URL
//! that ends up in an error or a log line.

use serde_json::Value;

use fleetsync_core::error::{excerpt, redact_url};
use fleetsync_core::{ApiError, HttpClient, MainWpSettings, SiteId};

use crate::types::{SiteDetails, SiteRecord, UpdateCounts};

const SERVICE: &str = "mainwp";
const API_PREFIX: &str = "wp-json/mainwp/v1";

/// Anything that can report the current state of one site.
///
/// [`crate::updater::wait_for_completion`] polls through this so the loop
/// can be driven without a dashboard.
pub trait SiteStatusSource {
    fn site_details(&self, site_id: &SiteId) -> Result<SiteDetails, ApiError>;
}

#[derive(Debug, Clone)]
pub struct MainWpClient {
    http: HttpClient,
    dashboard_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl MainWpClient {
    pub fn new(settings: &MainWpSettings) -> Self {
        Self {
            http: HttpClient::new(SERVICE),
            dashboard_url: settings.dashboard_url.trim_end_matches('/').to_string(),
            consumer_key: settings.consumer_key.clone(),
            consumer_secret: settings.consumer_secret.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{path}", self.dashboard_url)
    }

    fn authed(&self, method: &str, path: &str) -> ureq::Request {
        self.http
            .request(method, &self.endpoint(path))
            .query("consumer_key", &self.consumer_key)
            .query("consumer_secret", &self.consumer_secret)
    }

    /// Fleet-wide pending update totals.
    pub fn update_counts(&self) -> Result<UpdateCounts, ApiError> {
        let response = self
            .http
            .call(self.authed("GET", "sites/sites-available-updates-count"))?;
        self.http.read_json(response)
    }

    /// Every managed site, ordered by numeric site id.
    pub fn list_sites(&self) -> Result<Vec<SiteRecord>, ApiError> {
        let request = self
            .authed("GET", "sites/get-sites-by-url")
            .query("with_tags", "2");
        self.fetch_sites(request)
    }

    /// The site registered for `url`, if the dashboard knows it.
    pub fn find_site_by_url(&self, url: &str) -> Result<Option<SiteRecord>, ApiError> {
        let request = self
            .authed("GET", "sites/get-sites-by-url")
            .query("urls", url);
        let sites = self.fetch_sites(request)?;
        tracing::debug!(url, matches = sites.len(), "site lookup");
        Ok(sites.into_iter().next())
    }

    /// Full details for one site.
    pub fn site_details(&self, site_id: &SiteId) -> Result<SiteDetails, ApiError> {
        let request = self.authed("GET", "site/site").query("site_id", &site_id.0);
        let response = self.http.call(request)?;
        self.http.read_json(response)
    }

    /// Ask the child site to update WordPress core.
    pub fn update_wordpress(&self, site_id: &SiteId) -> Result<Value, ApiError> {
        self.trigger("site/site-update-wordpress", site_id)
    }

    /// Ask the child site to update every plugin with a pending upgrade.
    pub fn update_plugins(&self, site_id: &SiteId) -> Result<Value, ApiError> {
        self.trigger("site/site-update-plugins", site_id)
    }

    fn trigger(&self, path: &str, site_id: &SiteId) -> Result<Value, ApiError> {
        let request = self.authed("PUT", path).query("site_id", &site_id.0);
        let response = self.http.call(request)?;
        let body = self.http.read_text(response)?;
        tracing::info!(site_id = %site_id, endpoint = path, "update triggered");
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    fn fetch_sites(&self, request: ureq::Request) -> Result<Vec<SiteRecord>, ApiError> {
        let url = redact_url(request.url());
        let response = self.http.call(request)?;
        let body = self.http.read_text(response)?;
        parse_sites(&body).map_err(|message| ApiError::Decode {
            service: SERVICE,
            url,
            message,
        })
    }
}

impl SiteStatusSource for MainWpClient {
    fn site_details(&self, site_id: &SiteId) -> Result<SiteDetails, ApiError> {
        MainWpClient::site_details(self, site_id)
    }
}

/// Decode the id-keyed sites object.
///
/// PHP serialises an empty associative array as `[]`, so an empty array is
/// an empty listing. Anything else that is not an object is rejected with
/// the raw payload in the message.
pub(crate) fn parse_sites(body: &str) -> Result<Vec<SiteRecord>, String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| format!("{e}; raw payload: {}", excerpt(body)))?;
    let map = match value {
        Value::Object(map) => map,
        Value::Array(items) if items.is_empty() => return Ok(Vec::new()),
        other => {
            return Err(format!(
                "expected an object keyed by site id; raw payload: {}",
                excerpt(&other.to_string())
            ))
        }
    };

    let mut sites = Vec::with_capacity(map.len());
    for (id, entry) in map {
        let mut record: SiteRecord = serde_json::from_value(entry)
            .map_err(|e| format!("site {id}: {e}"))?;
        record.id = SiteId::from(id);
        sites.push(record);
    }
    sites.sort_by(|a, b| {
        let key = |s: &SiteRecord| s.id.0.parse::<u64>().unwrap_or(u64::MAX);
        key(a).cmp(&key(b)).then_with(|| a.id.cmp(&b.id))
    });
    Ok(sites)
}
