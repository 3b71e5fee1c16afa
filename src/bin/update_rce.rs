use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use rcemscraper::{
    config::{default_rce_start, init_logging, Settings},
    fetch::rce::fetch_points,
    history::{MergeOutcome, RceStore},
};
use std::path::PathBuf;
use tracing::info;

/// Backfill or extend `rce.json` with market prices from the PSE API.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// First business date, YYYY-MM-DD (default 2004-07-01).
    start: Option<String>,
    /// End business date, exclusive, YYYY-MM-DD (default today).
    end: Option<String>,
    /// Output file (defaults to `$DATA_DIR/rce.json`).
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("bad date {:?}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let settings = Settings::from_env()?;

    let start = match &args.start {
        Some(s) => parse_day(s)?,
        None => default_rce_start(),
    };
    let end = match &args.end {
        Some(s) => parse_day(s)?,
        None => Local::now().date_naive(),
    };
    if start >= end {
        bail!("start {} is not before end {}", start, end);
    }
    info!(%start, %end, "fetching RCE prices");

    let client = settings.http.build_client()?;
    let points = fetch_points(&client, &settings.http, &settings.rce_api_base, start, end).await;

    let store = RceStore::new(
        args.out.unwrap_or_else(|| settings.rce_file()),
        settings.rce_changes_file(),
    );
    match store.merge(&points)? {
        MergeOutcome::NothingNew => info!("no new hourly entries"),
        MergeOutcome::Appended(n) => info!(appended = n, "rce store updated"),
    }
    Ok(())
}
