//! Small domain types shared across crates.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// MainWP's identifier for a managed site (the key of the sites listing).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub String);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SiteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SiteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Status tones
// ---------------------------------------------------------------------------

/// Traffic-light classification used when rendering site status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Good,
    Warn,
    Bad,
}

impl Tone {
    /// 0 issues is good, up to 4 is a warning, 5 or more is bad.
    pub fn for_security_issues(issues: u32) -> Self {
        match issues {
            0 => Tone::Good,
            1..=4 => Tone::Warn,
            _ => Tone::Bad,
        }
    }

    /// Health score in percent: 80+ good, 50–79 warning, below 50 bad.
    pub fn for_health(score: u32) -> Self {
        match score {
            80.. => Tone::Good,
            50..=79 => Tone::Warn,
            _ => Tone::Bad,
        }
    }

    /// Pending plugin updates are a warning, never bad.
    pub fn for_plugin_updates(count: usize) -> Self {
        if count == 0 {
            Tone::Good
        } else {
            Tone::Warn
        }
    }

    /// A pending core update is bad.
    pub fn for_core_update(available: bool) -> Self {
        if available {
            Tone::Bad
        } else {
            Tone::Good
        }
    }
}
