//! fleetsync core library: settings, shared HTTP plumbing, errors, and the
//! small domain types every service crate agrees on.
//!
//! - [`settings`]: YAML file + environment layering, per-service views
//! - [`http`]: [`HttpClient`], a thin blocking wrapper over `ureq`
//! - [`error`]: [`ConfigError`] and [`ApiError`]
//! - [`types`]: identifiers and status tones

pub mod error;
pub mod http;
pub mod settings;
pub mod types;

pub use error::{ApiError, ConfigError};
pub use http::HttpClient;
pub use settings::{
    GitLabSettings, MainWpSettings, NotionSettings, PollSettings, Settings, TrackingDatabase,
    VirtualminSettings,
};
pub use types::{SiteId, Tone};
