//! MainWP payload types.
//!
//! The dashboard returns PHP-flavoured JSON: counters arrive as numbers or
//! numeric strings, and `plugin_upgrades` / `wp_upgrades` / `site_info` are
//! usually JSON documents *encoded inside a string*. The deserializers below
//! accept every form we have seen and fall back to zero / empty.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use fleetsync_core::SiteId;

const UNKNOWN: &str = "Unknown";

// ---------------------------------------------------------------------------
// Update counts
// ---------------------------------------------------------------------------

/// Fleet-wide totals from `sites/sites-available-updates-count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCounts {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub wordpress: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub plugins: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub themes: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub total: u32,
}

// ---------------------------------------------------------------------------
// Sites listing
// ---------------------------------------------------------------------------

/// One entry of the `sites/get-sites-by-url` object.
///
/// `id` is the object key, filled in by the client after decoding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SiteRecord {
    #[serde(skip)]
    pub id: SiteId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, rename = "securityIssues", deserialize_with = "lenient_u32")]
    pub security_issues: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub health_value: u32,
    #[serde(default, deserialize_with = "embedded_json")]
    pub plugin_upgrades: Value,
    #[serde(default, deserialize_with = "embedded_json")]
    pub wp_upgrades: Value,
    #[serde(default, deserialize_with = "embedded_json")]
    pub site_info: Value,
    #[serde(default, rename = "phpversion", deserialize_with = "lenient_opt_string")]
    pub php_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub wp_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub http_response_code: Option<String>,
}

/// Display-ready summary of a managed site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSnapshot {
    pub name: String,
    pub url: String,
    pub security_issues: u32,
    pub health: u32,
    pub core_update: bool,
    pub plugin_updates: usize,
    pub wp_version: String,
    pub php_version: String,
    pub child_version: String,
    pub last_check_status: String,
}

impl SiteRecord {
    pub fn plugin_update_count(&self) -> usize {
        entry_count(&self.plugin_upgrades)
    }

    pub fn has_core_update(&self) -> bool {
        entry_count(&self.wp_upgrades) > 0
    }

    pub fn snapshot(&self) -> SiteSnapshot {
        let wp_version = info_field(&self.site_info, "wpversion")
            .or_else(|| self.wp_version.clone())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let php_version = info_field(&self.site_info, "phpversion")
            .or_else(|| self.php_version.clone())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let child_version =
            info_field(&self.site_info, "child_version").unwrap_or_else(|| UNKNOWN.to_string());
        let last_check_status = match self.http_response_code.as_deref() {
            Some("200") => "200 - OK".to_string(),
            Some(code) => format!("{code} - Error"),
            None => "unknown - Error".to_string(),
        };

        SiteSnapshot {
            name: self.name.clone(),
            url: self.url.clone(),
            security_issues: self.security_issues,
            health: self.health_value,
            core_update: self.has_core_update(),
            plugin_updates: self.plugin_update_count(),
            wp_version,
            php_version,
            child_version,
            last_check_status,
        }
    }
}

// ---------------------------------------------------------------------------
// Single-site details
// ---------------------------------------------------------------------------

/// Payload of `site/site?site_id=…`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SiteDetails {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub wp_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub health_status: Option<String>,
    #[serde(default)]
    pub wp_core_update: Value,
    #[serde(default, deserialize_with = "embedded_json")]
    pub plugin_upgrades: Value,
    #[serde(default, deserialize_with = "embedded_json")]
    pub wp_upgrades: Value,
    #[serde(default, deserialize_with = "embedded_json")]
    pub site_info: Value,
}

impl SiteDetails {
    pub fn plugin_update_count(&self) -> usize {
        entry_count(&self.plugin_upgrades)
    }

    /// Core update pending, by either the explicit flag or the upgrade list.
    pub fn core_update_pending(&self) -> bool {
        truthy(&self.wp_core_update) || entry_count(&self.wp_upgrades) > 0
    }

    /// WordPress version as reported before any update was triggered.
    pub fn reported_wp_version(&self) -> String {
        self.wp_version
            .clone()
            .or_else(|| info_field(&self.site_info, "wpversion"))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// WordPress version from the freshly synced `site_info` blob.
    pub fn current_wp_version(&self) -> String {
        info_field(&self.site_info, "wpversion")
            .or_else(|| self.wp_version.clone())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Plugin slugs with a pending upgrade and the version on offer.
    pub fn pending_plugins(&self) -> Vec<(String, Option<String>)> {
        let Value::Object(map) = &self.plugin_upgrades else {
            return Vec::new();
        };
        map.iter()
            .map(|(slug, info)| {
                let version = info
                    .pointer("/update/new_version")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                (slug.clone(), version)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Keys of an object or items of an array; anything else counts as empty.
pub(crate) fn entry_count(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 0,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn info_field(info: &Value, key: &str) -> Option<String> {
    match info.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Leading decimal digits of `raw`, the way a dashboard counter is read.
fn leading_number(raw: &str) -> u32 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().map(clamp_u32).unwrap_or(0)
}

fn clamp_u32(v: u64) -> u32 {
    v.min(u64::from(u32::MAX)) as u32
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(clamp_u32)
            .unwrap_or(0),
        Some(Value::String(s)) => leading_number(&s),
        _ => 0,
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_opt_string(deserializer).map(Option::unwrap_or_default)
}

/// Accept a JSON value, a string holding JSON, or nothing.
fn embedded_json<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(s)) if s.trim().is_empty() => Value::Null,
        Some(Value::String(s)) => match serde_json::from_str(&s) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unparseable embedded JSON");
                Value::Null
            }
        },
        Some(other) => other,
    })
}
