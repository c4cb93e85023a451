//! Options and results shared by the sync pipelines.

use serde::Serialize;

use fleetsync_core::ApiError;
use fleetsync_notion::{
    missing_properties, reconcile_schema, NotionClient, RequiredProperty, SchemaMode, UpsertResult,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Perform every read, report the writes, send none of them.
    pub dry_run: bool,
}

/// What happened to one tracking row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Upserted(UpsertResult),
    /// Nothing to key the row on.
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    /// Title of the row (domain or repository name).
    pub key: String,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }
}

/// Full record of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub dry_run: bool,
    /// Columns that were (or, in a dry run, would be) added to the schema.
    pub schema_patched: Vec<String>,
    /// Set when the schema step failed but the run carried on.
    pub schema_error: Option<String>,
    pub items: Vec<SyncItem>,
}

impl SyncReport {
    pub(crate) fn new(options: SyncOptions) -> Self {
        Self {
            dry_run: options.dry_run,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, key: impl Into<String>, status: ItemStatus) {
        self.items.push(SyncItem {
            key: key.into(),
            status,
        });
    }

    /// Counts per outcome. Dry-run results count as the write they stand for.
    pub fn summary(&self) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for item in &self.items {
            match &item.status {
                ItemStatus::Upserted(result) if result.is_create() => summary.created += 1,
                ItemStatus::Upserted(_) => summary.updated += 1,
                ItemStatus::Skipped { .. } => summary.skipped += 1,
                ItemStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.schema_error.is_some() || self.summary().failed > 0
    }
}

/// Reconcile `required`, or in a dry run work out what would be patched.
pub(crate) fn prepare_schema(
    notion: &NotionClient,
    required: &[RequiredProperty],
    mode: SchemaMode,
    dry_run: bool,
) -> Result<Vec<String>, ApiError> {
    if !dry_run {
        return reconcile_schema(notion, required, mode);
    }
    let names = match mode {
        SchemaMode::Force => required.iter().map(|p| p.name.to_string()).collect(),
        SchemaMode::MissingOnly => {
            let existing = notion.retrieve_database()?;
            missing_properties(required, &existing)
                .into_iter()
                .map(|p| p.name.to_string())
                .collect()
        }
    };
    tracing::info!(database = notion.database_id(), columns = ?names, "[dry-run] would patch schema");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upserted(result: UpsertResult) -> ItemStatus {
        ItemStatus::Upserted(result)
    }

    #[test]
    fn summary_counts_each_outcome() {
        let mut report = SyncReport::new(SyncOptions::default());
        report.record("a", upserted(UpsertResult::Created { page_id: "1".into() }));
        report.record("b", upserted(UpsertResult::Updated { page_id: "2".into() }));
        report.record("c", upserted(UpsertResult::Updated { page_id: "3".into() }));
        report.record("d", ItemStatus::Failed { error: "boom".into() });
        report.record("", ItemStatus::Skipped { reason: "blank".into() });

        let summary = report.summary();
        assert_eq!(
            summary,
            SyncSummary {
                created: 1,
                updated: 2,
                skipped: 1,
                failed: 1
            }
        );
        assert_eq!(summary.total(), 5);
        assert!(report.has_failures());
    }

    #[test]
    fn dry_run_results_count_as_their_writes() {
        let mut report = SyncReport::new(SyncOptions { dry_run: true });
        report.record("a", upserted(UpsertResult::WouldCreate));
        report.record("b", upserted(UpsertResult::WouldUpdate { page_id: "2".into() }));
        let summary = report.summary();
        assert_eq!((summary.created, summary.updated), (1, 1));
        assert!(!report.has_failures());
    }

    #[test]
    fn schema_error_alone_is_a_failure() {
        let report = SyncReport {
            schema_error: Some("forbidden".into()),
            ..SyncReport::default()
        };
        assert!(report.has_failures());
    }
}
