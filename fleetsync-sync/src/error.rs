//! Error types for fleetsync-sync.

use thiserror::Error;

use fleetsync_core::ApiError;

/// Failures that stop a pipeline. Per-row failures are recorded in the
/// [`crate::SyncReport`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source listing could not be fetched, so there is nothing to sync.
    #[error("could not list {what}: {source}")]
    Listing {
        what: &'static str,
        #[source]
        source: ApiError,
    },

    /// The tracking database schema could not be read or patched.
    #[error("could not prepare the {database} database schema: {source}")]
    Schema {
        database: &'static str,
        #[source]
        source: ApiError,
    },
}
