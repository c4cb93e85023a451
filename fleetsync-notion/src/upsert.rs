//! Update-or-create a tracking row keyed by its title.

use fleetsync_core::ApiError;

use crate::client::NotionClient;
use crate::props::Properties;

/// Outcome of a single upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertResult {
    Created { page_id: String },
    Updated { page_id: String },
    /// `dry_run`: no page matched, one would have been created.
    WouldCreate,
    /// `dry_run`: this page would have been updated.
    WouldUpdate { page_id: String },
}

impl UpsertResult {
    pub fn is_create(&self) -> bool {
        matches!(self, UpsertResult::Created { .. } | UpsertResult::WouldCreate)
    }
}

/// Look up the page titled `title`; update the first match with
/// `on_update`, or create one from `on_create` when none exists.
///
/// Duplicate titles are left alone apart from a warning.
pub fn upsert_by_title(
    client: &NotionClient,
    title_property: &str,
    title: &str,
    on_update: &Properties,
    on_create: &Properties,
    dry_run: bool,
) -> Result<UpsertResult, ApiError> {
    let matches = client.query_by_title(title_property, title)?;
    if matches.len() > 1 {
        tracing::warn!(
            title,
            duplicates = matches.len() - 1,
            "several tracking rows share a title; updating the first"
        );
    }

    match matches.into_iter().next() {
        Some(page_id) if dry_run => Ok(UpsertResult::WouldUpdate { page_id }),
        Some(page_id) => {
            client.update_page(&page_id, on_update)?;
            tracing::info!(title, page_id = %page_id, "tracking row updated");
            Ok(UpsertResult::Updated { page_id })
        }
        None if dry_run => Ok(UpsertResult::WouldCreate),
        None => {
            let page_id = client.create_page(on_create)?;
            tracing::info!(title, page_id = %page_id, "tracking row created");
            Ok(UpsertResult::Created { page_id })
        }
    }
}
