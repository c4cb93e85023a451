//! Hosted domains → Notion domains database.
//!
//! Every domain on the live server gets a row keyed by its `Domain` title.
//! Rows of domains MainWP manages carry the site's health figures and
//! `Maintenance = Yes`; the rest are zeroed with `Maintenance = No`.

use chrono::{DateTime, Utc};

use fleetsync_mainwp::{MainWpClient, SiteSnapshot};
use fleetsync_notion::{
    upsert_by_title, NotionClient, Properties, PropertyKind, RequiredProperty, SchemaMode,
};
use fleetsync_sources::{LiveDomain, VirtualminClient};

use crate::error::SyncError;
use crate::report::{prepare_schema, ItemStatus, SyncOptions, SyncReport};

const YES_NO: &[&str] = &["Yes", "No"];
const UNKNOWN_PHP: &str = "Unknown";

pub const DOMAIN: &str = "Domain";
pub const SITE_URL: &str = "Site URL";
pub const PLUGIN_UPDATES: &str = "Number of Plugin Updates";
pub const SECURITY_ISSUES: &str = "Number of Security Issues";
pub const HEALTH_SCORE: &str = "Site Health Score";
pub const CORE_UPDATE: &str = "Core Update Available";
pub const PHP_VERSION: &str = "PHP Version";
pub const LAST_CHECKED: &str = "Last Checked";
pub const MAINTENANCE: &str = "Maintenance";

pub const DOMAINS_SCHEMA: &[RequiredProperty] = &[
    RequiredProperty::new(DOMAIN, PropertyKind::Title),
    RequiredProperty::new(SITE_URL, PropertyKind::Url),
    RequiredProperty::new(PLUGIN_UPDATES, PropertyKind::Number),
    RequiredProperty::new(SECURITY_ISSUES, PropertyKind::Number),
    RequiredProperty::new(HEALTH_SCORE, PropertyKind::Number),
    RequiredProperty::new(CORE_UPDATE, PropertyKind::MultiSelect(YES_NO)),
    RequiredProperty::new(PHP_VERSION, PropertyKind::RichText),
    RequiredProperty::new(LAST_CHECKED, PropertyKind::Date),
    RequiredProperty::new(MAINTENANCE, PropertyKind::MultiSelect(YES_NO)),
];

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Properties written to an existing row.
///
/// An unmanaged domain keeps whatever `Site URL` the row already had.
pub fn update_properties(
    domain: &str,
    site: Option<&SiteSnapshot>,
    checked_at: DateTime<Utc>,
) -> Properties {
    let base = Properties::new()
        .title(DOMAIN, domain)
        .date(LAST_CHECKED, Some(checked_at));

    match site {
        Some(site) => {
            let base = if site.url.trim().is_empty() {
                base
            } else {
                base.url(SITE_URL, Some(&site.url))
            };
            base.number(PLUGIN_UPDATES, site.plugin_updates as u64)
                .number(SECURITY_ISSUES, u64::from(site.security_issues))
                .number(HEALTH_SCORE, u64::from(site.health))
                .multi_select(CORE_UPDATE, &[yes_no(site.core_update)])
                .rich_text(PHP_VERSION, &site.php_version)
                .multi_select(MAINTENANCE, &["Yes"])
        }
        None => unmanaged_defaults(base),
    }
}

/// Properties for a brand-new row: the full default set, overlaid with
/// whatever the site provides.
pub fn create_properties(
    domain: &str,
    site: Option<&SiteSnapshot>,
    checked_at: DateTime<Utc>,
) -> Properties {
    let defaults = unmanaged_defaults(Properties::new()).url(SITE_URL, None);
    defaults.merge(update_properties(domain, site, checked_at))
}

fn unmanaged_defaults(base: Properties) -> Properties {
    base.number(PLUGIN_UPDATES, 0)
        .number(SECURITY_ISSUES, 0)
        .number(HEALTH_SCORE, 0)
        .multi_select(CORE_UPDATE, &["No"])
        .rich_text(PHP_VERSION, UNKNOWN_PHP)
        .multi_select(MAINTENANCE, &["No"])
}

/// Mirror every hosted domain into the domains database.
///
/// A schema failure is recorded and the run continues; a failed domain
/// listing ends it. Per-domain failures are recorded in the report.
pub fn run(
    virtualmin: &VirtualminClient,
    mainwp: &MainWpClient,
    notion: &NotionClient,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::new(options);

    match prepare_schema(notion, DOMAINS_SCHEMA, SchemaMode::Force, options.dry_run) {
        Ok(patched) => report.schema_patched = patched,
        Err(err) => {
            tracing::error!(error = %err, "domains schema update failed; continuing");
            report.schema_error = Some(err.to_string());
        }
    }

    let domains = virtualmin
        .list_domains()
        .map_err(|source| SyncError::Listing {
            what: "live domains",
            source,
        })?;
    tracing::info!(count = domains.len(), "syncing domains to notion");

    for live in &domains {
        let status = sync_domain(mainwp, notion, live, options);
        report.record(live.domain.clone(), status);
    }

    let summary = report.summary();
    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        failed = summary.failed,
        dry_run = options.dry_run,
        "domain sync finished"
    );
    Ok(report)
}

fn sync_domain(
    mainwp: &MainWpClient,
    notion: &NotionClient,
    live: &LiveDomain,
    options: SyncOptions,
) -> ItemStatus {
    let site = match mainwp.find_site_by_url(&live.url) {
        Ok(record) => record.map(|r| r.snapshot()),
        Err(err) => {
            tracing::warn!(domain = %live.domain, error = %err, "site lookup failed; recording as unmanaged");
            None
        }
    };

    let checked_at = Utc::now();
    let on_update = update_properties(&live.domain, site.as_ref(), checked_at);
    let on_create = create_properties(&live.domain, site.as_ref(), checked_at);

    match upsert_by_title(notion, DOMAIN, &live.domain, &on_update, &on_create, options.dry_run) {
        Ok(result) => ItemStatus::Upserted(result),
        Err(err) => {
            tracing::error!(domain = %live.domain, error = %err, "domain row sync failed");
            ItemStatus::Failed {
                error: err.to_string(),
            }
        }
    }
}
