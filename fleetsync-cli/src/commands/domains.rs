//! `fleetsync domains`: hosted domains and whether MainWP manages them.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fleetsync_core::Settings;
use fleetsync_mainwp::MainWpClient;
use fleetsync_sources::VirtualminClient;
use fleetsync_sync::{live_report, LiveDomainStatus};

use crate::style;

/// Arguments for `fleetsync domains`.
#[derive(Args, Debug)]
pub struct DomainsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl DomainsArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let virtualmin = VirtualminClient::new(&settings.virtualmin()?)
            .context("failed to set up the Virtualmin client")?;
        let mainwp = MainWpClient::new(&settings.mainwp()?);

        if !self.json {
            println!("Fetching domains from Virtualmin...");
        }
        let statuses = live_report::collect(&virtualmin, &mainwp)
            .context("failed to build the live domain report")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&statuses)?);
            return Ok(());
        }

        println!("\n{} domains found on server.\n", statuses.len());
        for status in &statuses {
            println!("{}", render_line(status));
        }
        Ok(())
    }
}

fn render_line(status: &LiveDomainStatus) -> String {
    match &status.site {
        Some(site) => format!(
            "Name: {} | URL: {} | Security issues: {} | Site health: {} | Core Update: {} | Plugin Updates: {}",
            site.name,
            site.url,
            style::security(site.security_issues),
            style::health(site.health),
            style::core_update(site.core_update),
            style::plugin_updates(site.plugin_updates),
        ),
        None => format!("{} - Not found on WPmanage", status.domain)
            .red()
            .to_string(),
    }
}
