//! # fleetsync-mainwp
//!
//! Client for the MainWP dashboard REST API (`/wp-json/mainwp/v1`), the
//! reshaping of its loosely typed site payloads into [`SiteSnapshot`]s, and
//! the trigger-then-poll update flow in [`updater`].

pub mod client;
pub mod types;
pub mod updater;

pub use client::{MainWpClient, SiteStatusSource};
pub use types::{SiteDetails, SiteRecord, SiteSnapshot, UpdateCounts};
pub use updater::{
    apply, progress_for, wait_for_completion, TriggerResult, UpdateKind, UpdateOutcome,
    UpdatePlan, WaitOutcome,
};
