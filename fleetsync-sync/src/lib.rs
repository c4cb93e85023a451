//! # fleetsync-sync
//!
//! Pipelines that read from the hosting panel, the WordPress dashboard and
//! GitLab, and write tracking rows into Notion.
//!
//! - [`live_report::collect`] pairs every hosted domain with its MainWP site.
//! - [`domains::run`] mirrors that pairing into the domains database.
//! - [`repos::run`] mirrors owned GitLab projects into the repositories database.

pub mod domains;
pub mod error;
pub mod live_report;
pub mod repos;
pub mod report;

pub use error::SyncError;
pub use live_report::LiveDomainStatus;
pub use report::{ItemStatus, SyncItem, SyncOptions, SyncReport, SyncSummary};
