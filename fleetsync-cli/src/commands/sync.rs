//! `fleetsync sync`: mirror domains or repositories into Notion.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use fleetsync_core::{Settings, TrackingDatabase};
use fleetsync_mainwp::MainWpClient;
use fleetsync_notion::{NotionClient, UpsertResult};
use fleetsync_sources::{GitLabClient, VirtualminClient};
use fleetsync_sync::{domains, repos, ItemStatus, SyncOptions, SyncReport};

#[derive(Subcommand, Debug)]
pub enum SyncCommand {
    /// Hosted domains and their MainWP status → the domains database.
    Domains(SyncArgs),
    /// Owned GitLab projects and their last commit → the repositories database.
    Repos(SyncArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Read everything and show what would change without writing to Notion.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    fn options(&self) -> SyncOptions {
        SyncOptions {
            dry_run: self.dry_run,
        }
    }
}

pub fn run(command: SyncCommand, settings: &Settings) -> Result<()> {
    let (label, report) = match command {
        SyncCommand::Domains(args) => {
            let virtualmin = VirtualminClient::new(&settings.virtualmin()?)
                .context("failed to set up the Virtualmin client")?;
            let mainwp = MainWpClient::new(&settings.mainwp()?);
            let notion = NotionClient::new(
                &settings.notion()?,
                &settings.notion_database(TrackingDatabase::Domains)?,
            );
            let report = domains::run(&virtualmin, &mainwp, &notion, args.options())
                .context("domain sync failed")?;
            ("domains", report)
        }
        SyncCommand::Repos(args) => {
            let gitlab = GitLabClient::new(&settings.gitlab()?);
            let notion = NotionClient::new(
                &settings.notion()?,
                &settings.notion_database(TrackingDatabase::Repos)?,
            );
            let report =
                repos::run(&gitlab, &notion, args.options()).context("repository sync failed")?;
            ("repositories", report)
        }
    };

    print_report(label, &report);
    if report.has_failures() {
        bail!("{label} sync finished with failures");
    }
    Ok(())
}

fn print_report(label: &str, report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    if let Some(error) = &report.schema_error {
        println!("{prefix}{} schema update failed: {error}", "✗".red());
    } else if !report.schema_patched.is_empty() {
        println!(
            "{prefix}schema columns {}: {}",
            if report.dry_run { "to patch" } else { "patched" },
            report.schema_patched.join(", ")
        );
    }

    for item in &report.items {
        match &item.status {
            ItemStatus::Upserted(UpsertResult::Created { .. }) => {
                println!("  +  {}", item.key)
            }
            ItemStatus::Upserted(UpsertResult::Updated { .. }) => {
                println!("  ✎  {}", item.key)
            }
            ItemStatus::Upserted(UpsertResult::WouldCreate) => {
                println!("{prefix}  +  {} (would create)", item.key)
            }
            ItemStatus::Upserted(UpsertResult::WouldUpdate { .. }) => {
                println!("{prefix}  ~  {} (would update)", item.key)
            }
            ItemStatus::Skipped { reason } => println!("  ·  {} ({reason})", item.key),
            ItemStatus::Failed { error } => {
                println!("  {}  {}: {error}", "✗".red(), item.key)
            }
        }
    }

    let summary = report.summary();
    let line = format!(
        "{prefix}{label} sync: {} created, {} updated, {} skipped, {} failed",
        summary.created, summary.updated, summary.skipped, summary.failed
    );
    if summary.failed > 0 || report.schema_error.is_some() {
        println!("{}", line.yellow());
    } else {
        println!("{} {line}", "✓".green());
    }
}
