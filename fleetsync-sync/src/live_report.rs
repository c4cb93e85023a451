//! Which hosted domains are managed by the dashboard, and in what state.

use serde::Serialize;

use fleetsync_mainwp::{MainWpClient, SiteSnapshot};
use fleetsync_sources::VirtualminClient;

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveDomainStatus {
    pub domain: String,
    /// `None` when MainWP does not manage the domain, or the lookup failed.
    pub site: Option<SiteSnapshot>,
}

impl LiveDomainStatus {
    pub fn is_managed(&self) -> bool {
        self.site.is_some()
    }
}

/// List every hosted domain and look it up in MainWP, in server order.
pub fn collect(
    virtualmin: &VirtualminClient,
    mainwp: &MainWpClient,
) -> Result<Vec<LiveDomainStatus>, SyncError> {
    let domains = virtualmin
        .list_domains()
        .map_err(|source| SyncError::Listing {
            what: "live domains",
            source,
        })?;

    let statuses = domains
        .into_iter()
        .map(|live| {
            let site = match mainwp.find_site_by_url(&live.domain) {
                Ok(Some(record)) => Some(record.snapshot()),
                Ok(None) => {
                    tracing::debug!(domain = %live.domain, "not managed by MainWP");
                    None
                }
                Err(err) => {
                    tracing::warn!(domain = %live.domain, error = %err, "site lookup failed");
                    None
                }
            };
            LiveDomainStatus {
                domain: live.domain,
                site,
            }
        })
        .collect::<Vec<_>>();

    let managed = statuses.iter().filter(|s| s.is_managed()).count();
    tracing::info!(domains = statuses.len(), managed, "live domain report collected");
    Ok(statuses)
}
