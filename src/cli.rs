use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::audit::{export_audit_logs, DEFAULT_MONTHS};
use crate::client::AtlassianClient;
use crate::contract::AuditWindow;
use crate::load_config::{load_audit_config, load_report_config, load_restore_config};
use crate::report::run_report;
use crate::restore::restore_user_access;
use crate::storage::GcsStore;

/// CLI for jira-roster: access rosters, account restoration and audit exports.
#[derive(Parser)]
#[clap(
    name = "jira-roster",
    version,
    about = "Build and publish Jira project access rosters, restore user access and export audit logs"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the access roster PDF for PROJECT_KEY and publish it on ISSUE_KEY
    Report {
        /// Optional YAML file with report settings
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Look up TARGET_EMAIL and restore the account's access
    RestoreAccess {
        /// Also write the result lines to this file
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Export Jira and Confluence audit logs to Cloud Storage
    AuditExport {
        /// Number of months to look back
        #[clap(long, default_value_t = DEFAULT_MONTHS)]
        months: u32,
        /// Directory for the local CSV files
        #[clap(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

/// Async CLI entrypoint shared by main() and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Report { config } => {
            let config = load_report_config(config.as_deref())?;
            let client = AtlassianClient::new(&config.jira, config.admin.as_ref())?;
            println!("Building access roster for {}...", config.project_key);
            let summary = run_report(&config, &client, &client, &client)
                .await
                .map_err(|e| {
                    eprintln!("[ERROR] Report failed: {e}");
                    anyhow::Error::new(e)
                })?;
            println!("Report complete.\nSummary:");
            println!("{summary:#?}");
        }
        Commands::RestoreAccess { output } => {
            let config = load_restore_config()?;
            let client = AtlassianClient::new(&config.jira, Some(&config.admin))?;
            let outcome = restore_user_access(
                &client,
                &client,
                &config.target_email,
                config.support_ticket_url.as_deref(),
            )
            .await?;
            let lines = outcome.lines();
            for line in &lines {
                println!("{line}");
            }
            if let Some(path) = output {
                fs::write(&path, lines.join("\n"))
                    .with_context(|| format!("writing result file {}", path.display()))?;
                tracing::info!(file = ?path, "Wrote restore result");
            }
        }
        Commands::AuditExport { months, output_dir } => {
            let config = load_audit_config()?;
            let client = AtlassianClient::new(&config.jira, None)?;
            let store = GcsStore::new(&config.storage)?;
            let now = Utc::now();
            let window = AuditWindow::last_months(now, months);
            let exports = export_audit_logs(
                &client,
                &store,
                window,
                now,
                &output_dir,
                config.storage.folder.as_deref(),
            )
            .await?;
            for export in exports {
                match export.location {
                    Some(location) => println!(
                        "Uploaded {} {} audit records to {location}",
                        export.records,
                        export.product.name()
                    ),
                    None => println!("No {} audit records found.", export.product.name()),
                }
            }
        }
    }
    Ok(())
}
