use anyhow::Result;
use clap::Parser;
use rcemscraper::{
    config::{init_logging, Settings},
    fetch::PageSource,
    history::{RcemStore, UpdateOutcome},
    process,
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};

/// Scrape the published RCEm table and refresh `rcem.json`.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Parse a saved copy of the page instead of downloading it.
    #[arg(long)]
    html: Option<PathBuf>,
    /// Output file (defaults to `$DATA_DIR/rcem.json`).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Change log file (defaults to `$DATA_DIR/rcem_changes.txt`).
    #[arg(long)]
    changes: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // ─── 1) init logging + settings ──────────────────────────────────
    init_logging();
    let args = Args::parse();
    let settings = Settings::from_env()?;
    info!("startup");

    // ─── 2) fetch ────────────────────────────────────────────────────
    let source = match &args.html {
        Some(path) => PageSource::Cached(path.clone()),
        None => PageSource::remote(&settings.rcem_url)?,
    };
    let client = settings.http.build_client()?;
    let html = match source.load(&client, &settings.http).await {
        Ok(html) => html,
        Err(e) => {
            error!(error = %e, "fetching RCEm page failed");
            return Err(e);
        }
    };

    // ─── 3) parse ────────────────────────────────────────────────────
    let parsed = process::parse_html(&html);
    if parsed.is_empty() {
        error!("no data parsed from page");
        return Ok(ExitCode::FAILURE);
    }

    // ─── 4) diff + persist ───────────────────────────────────────────
    let store = RcemStore::new(
        args.out.unwrap_or_else(|| settings.rcem_file()),
        args.changes.unwrap_or_else(|| settings.rcem_changes_file()),
    );
    match store.update(&parsed)? {
        UpdateOutcome::Unchanged => info!("no changes in RCEm data"),
        UpdateOutcome::Written { entries, changes } => {
            info!(entries, changes = changes.len(), "RCEm data updated");
            for c in &changes {
                info!("{}", c);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
