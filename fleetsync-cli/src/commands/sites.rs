//! `fleetsync sites`: browse managed sites and trigger updates.
//!
//! Without a subcommand this is an interactive loop: pick a site, review
//! it, confirm, trigger core and plugin updates, then pick again until
//! `Exit` is chosen.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

use fleetsync_core::{PollSettings, Settings, SiteId};
use fleetsync_mainwp::{
    apply, wait_for_completion, MainWpClient, SiteDetails, SiteRecord, SiteSnapshot,
    TriggerResult, UpdateCounts, UpdateKind, UpdatePlan, WaitOutcome,
};

use crate::style;

/// Arguments for `fleetsync sites`.
#[derive(Args, Debug)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: Option<SitesCommand>,

    /// After triggering updates, poll until the dashboard shows them applied.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Subcommand, Debug)]
pub enum SitesCommand {
    /// Print every managed site with its update status.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Trigger updates on one site without prompting for a selection.
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// MainWP site id (see `fleetsync sites list`).
    pub site_id: String,

    /// Poll until the updates are applied.
    #[arg(long)]
    pub wait: bool,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl SitesArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let client = MainWpClient::new(&settings.mainwp()?);
        let poll = settings.poll();
        match self.command {
            None => interactive(&client, poll, self.wait),
            Some(SitesCommand::List { json }) => list(&client, json),
            Some(SitesCommand::Update(args)) => update_one(&client, poll, args),
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive loop
// ---------------------------------------------------------------------------

fn interactive(client: &MainWpClient, poll: PollSettings, wait: bool) -> Result<()> {
    let theme = ColorfulTheme::default();

    loop {
        match client.update_counts() {
            Ok(counts) => print_counts(&counts),
            Err(err) => eprintln!("{} could not fetch update counts: {err}", "warning:".yellow()),
        }

        let sites = client.list_sites().context("failed to list MainWP sites")?;
        let mut choices: Vec<String> = sites.iter().map(site_label).collect();
        choices.push("Exit".to_string());

        let picked = Select::with_theme(&theme)
            .with_prompt("Select a site to update or exit")
            .items(&choices)
            .default(0)
            .interact()?;
        let Some(site) = sites.get(picked) else {
            println!("Exiting...");
            return Ok(());
        };

        println!("\nFetching detailed information for {}", site.name);
        let details = match client.site_details(&site.id) {
            Ok(details) => details,
            Err(err) => {
                eprintln!("{} {err}", "error:".red());
                continue;
            }
        };
        print_details(site, &details);

        let proceed = Confirm::with_theme(&theme)
            .with_prompt("Do you want to perform updates on this site?")
            .default(false)
            .interact()?;
        if proceed {
            perform_updates(client, &site.id, &details, poll, wait);
        }
    }
}

fn site_label(site: &SiteRecord) -> String {
    format!(
        "{} - Security issues: {} - Health: {}",
        site.name,
        style::security(site.security_issues),
        style::health(site.health_value),
    )
}

fn print_counts(counts: &UpdateCounts) {
    println!("\nSites with available updates:");
    println!("WordPress: {}", counts.wordpress);
    println!("Plugins: {}", counts.plugins);
    println!("Themes: {}", counts.themes);
    println!("Total: {}", counts.total);
    println!("-----------------------------------");
}

fn print_details(site: &SiteRecord, details: &SiteDetails) {
    println!("\nSite Details:");
    println!("Name: {}", site.name);
    println!("URL: {}", site.url);
    println!("Security issues: {}", style::security(site.security_issues));
    println!("Site health: {}", style::health(site.health_value));
    println!("WordPress version: {}", details.reported_wp_version());
    println!(
        "Site health status: {}",
        details.health_status.as_deref().unwrap_or("N/A")
    );
    let pending = details.pending_plugins();
    if !pending.is_empty() {
        println!("Plugins needing updates:");
        for (slug, version) in pending {
            println!("  - {slug}: {}", version.as_deref().unwrap_or("unknown"));
        }
    }
}

// ---------------------------------------------------------------------------
// Update flow
// ---------------------------------------------------------------------------

fn update_one(client: &MainWpClient, poll: PollSettings, args: UpdateArgs) -> Result<()> {
    let site_id = SiteId::from(args.site_id);
    let details = client
        .site_details(&site_id)
        .with_context(|| format!("failed to fetch details for site {site_id}"))?;
    println!(
        "{} ({}) - WordPress {} - {} plugin update(s) pending",
        details.name,
        details.url,
        details.reported_wp_version(),
        details.plugin_update_count()
    );

    if !args.yes {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Do you want to perform updates on this site?")
            .default(false)
            .interact()?;
        if !proceed {
            println!("Nothing triggered.");
            return Ok(());
        }
    }

    let triggered = perform_updates(client, &site_id, &details, poll, args.wait);
    if !triggered {
        anyhow::bail!("no update could be triggered for site {site_id}");
    }
    Ok(())
}

/// Trigger, optionally wait, then show the refreshed state. Returns whether
/// at least one trigger was accepted.
fn perform_updates(
    client: &MainWpClient,
    site_id: &SiteId,
    details: &SiteDetails,
    poll: PollSettings,
    wait: bool,
) -> bool {
    let plan = UpdatePlan::for_site(details);
    println!("\nChecking and potentially updating WordPress core...");
    if !plan.plugins {
        println!("No plugin updates available according to MainWP data.");
    }

    let outcome = apply(client, site_id, plan);
    report_trigger(UpdateKind::WordPress, &outcome.core);
    report_trigger(UpdateKind::Plugins, &outcome.plugins);

    let sent = outcome.sent_kinds();
    if wait {
        for kind in &sent {
            wait_with_bar(client, site_id, *kind, poll);
        }
    } else if !sent.is_empty() {
        println!("\nUpdate requests sent. Check the MainWP dashboard for detailed update status.");
    }

    println!("Fetching latest site details...");
    match client.site_details(site_id) {
        Ok(fresh) => {
            println!("Current WordPress version: {}", fresh.current_wp_version());
            println!(
                "Current plugin updates available: {}",
                fresh.plugin_update_count()
            );
        }
        Err(err) => eprintln!("{} {err}", "error:".red()),
    }

    !sent.is_empty()
}

fn report_trigger(kind: UpdateKind, result: &TriggerResult) {
    let label = match kind {
        UpdateKind::WordPress => "WordPress core",
        UpdateKind::Plugins => "Plugin",
    };
    match result {
        TriggerResult::Sent(body) => println!("{label} update response: {}", render_body(body)),
        TriggerResult::Failed(err) => {
            println!("{} {label} update failed: {err}", "✗".red())
        }
        TriggerResult::Skipped => {}
    }
}

fn render_body(body: &Value) -> String {
    match body {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn wait_with_bar(client: &MainWpClient, site_id: &SiteId, kind: UpdateKind, poll: PollSettings) {
    let bar = ProgressBar::new(100);
    if let Ok(template) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}% ({elapsed})") {
        bar.set_style(template.progress_chars("█░ "));
    }
    bar.set_message(format!("waiting for {kind}"));

    match wait_for_completion(client, site_id, kind, poll, &bar) {
        Ok(WaitOutcome::Completed { polls }) => {
            println!("{} {kind} update applied (after {polls} checks)", "✓".green())
        }
        Ok(WaitOutcome::TimedOut { polls }) => println!(
            "{}",
            format!("{kind} update still pending after {polls} checks; giving up").yellow()
        ),
        Err(err) => eprintln!("{} failed to fetch site details: {err}", "error:".red()),
    }
}

// ---------------------------------------------------------------------------
// Non-interactive listing
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SiteJson {
    id: String,
    #[serde(flatten)]
    snapshot: SiteSnapshot,
}

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "site")]
    name: String,
    #[tabled(rename = "security")]
    security: String,
    #[tabled(rename = "health")]
    health: String,
    #[tabled(rename = "core")]
    core: String,
    #[tabled(rename = "plugins")]
    plugins: String,
    #[tabled(rename = "wordpress")]
    wp_version: String,
    #[tabled(rename = "php")]
    php_version: String,
    #[tabled(rename = "last check")]
    last_check: String,
}

fn list(client: &MainWpClient, json: bool) -> Result<()> {
    let sites = client.list_sites().context("failed to list MainWP sites")?;

    if json {
        let payload: Vec<SiteJson> = sites
            .iter()
            .map(|site| SiteJson {
                id: site.id.to_string(),
                snapshot: site.snapshot(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if sites.is_empty() {
        println!("No sites are managed by this dashboard.");
        return Ok(());
    }

    let rows: Vec<SiteRow> = sites
        .iter()
        .map(|site| {
            let snap = site.snapshot();
            SiteRow {
                id: site.id.to_string(),
                name: snap.name,
                security: style::security(snap.security_issues).to_string(),
                health: style::health(snap.health).to_string(),
                core: style::core_update(snap.core_update).to_string(),
                plugins: style::plugin_updates(snap.plugin_updates).to_string(),
                wp_version: snap.wp_version,
                php_version: snap.php_version,
                last_check: snap.last_check_status,
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
