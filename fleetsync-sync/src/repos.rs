//! Owned GitLab projects → Notion repositories database, keyed by `Name`.

use fleetsync_notion::{
    upsert_by_title, NotionClient, Properties, PropertyKind, RequiredProperty, SchemaMode,
};
use fleetsync_sources::{GitLabClient, RepoSummary};

use crate::error::SyncError;
use crate::report::{prepare_schema, ItemStatus, SyncOptions, SyncReport};

pub const NAME: &str = "Name";
pub const URL: &str = "URL";
pub const LAST_COMMIT: &str = "Last Commit";
pub const DEVELOPER: &str = "Developer";
pub const COMMENT: &str = "Comment";

pub const REPOS_SCHEMA: &[RequiredProperty] = &[
    RequiredProperty::new(NAME, PropertyKind::Title),
    RequiredProperty::new(URL, PropertyKind::Url),
    RequiredProperty::new(LAST_COMMIT, PropertyKind::Date),
    RequiredProperty::new(DEVELOPER, PropertyKind::RichText),
    RequiredProperty::new(COMMENT, PropertyKind::RichText),
];

/// Row properties for a repository; used for both create and update.
pub fn repo_properties(repo: &RepoSummary) -> Properties {
    Properties::new()
        .title(NAME, &repo.name)
        .url(URL, Some(&repo.url))
        .date(LAST_COMMIT, repo.last_commit_at)
        .rich_text(DEVELOPER, &repo.committer)
        .rich_text(COMMENT, &repo.message)
}

/// Mirror owned projects into the repositories database.
///
/// Missing columns are added first; failing to do so ends the run, as does
/// failing to list projects.
pub fn run(
    gitlab: &GitLabClient,
    notion: &NotionClient,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::new(options);
    report.schema_patched = prepare_schema(
        notion,
        REPOS_SCHEMA,
        SchemaMode::MissingOnly,
        options.dry_run,
    )
    .map_err(|source| SyncError::Schema {
        database: "repositories",
        source,
    })?;

    let repos = gitlab.list_repos().map_err(|source| SyncError::Listing {
        what: "gitlab projects",
        source,
    })?;
    tracing::info!(count = repos.len(), "syncing repositories to notion");

    for repo in &repos {
        if repo.name.trim().is_empty() {
            tracing::warn!(url = %repo.url, "project without a name; skipped");
            report.record(
                repo.url.clone(),
                ItemStatus::Skipped {
                    reason: "project has no name".to_string(),
                },
            );
            continue;
        }

        let props = repo_properties(repo);
        let status = match upsert_by_title(notion, NAME, &repo.name, &props, &props, options.dry_run)
        {
            Ok(result) => ItemStatus::Upserted(result),
            Err(err) => {
                tracing::error!(repo = %repo.name, error = %err, "repository row sync failed");
                ItemStatus::Failed {
                    error: err.to_string(),
                }
            }
        };
        report.record(repo.name.clone(), status);
    }

    let summary = report.summary();
    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.failed,
        dry_run = options.dry_run,
        "repository sync finished"
    );
    Ok(report)
}
