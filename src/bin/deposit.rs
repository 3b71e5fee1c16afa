use anyhow::Result;
use clap::Parser;
use glob::glob;
use rcemscraper::{
    config::{init_logging, Settings},
    deposit::{
        self, billing_month, hourly_average, hourly_deposit, meter, monthly_deposit,
        monthly_price, report, DepositConfig, FileReport,
    },
    history::{RceStore, RcemStore},
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Value exported energy from meter CSV exports with RCE and RCEm prices.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Meter CSV files (default: every `*.csv` in the current directory).
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let settings = Settings::from_env()?;
    let cfg = DepositConfig::default();

    let files: Vec<PathBuf> = if args.files.is_empty() {
        glob("*.csv")?.filter_map(Result::ok).collect()
    } else {
        args.files
    };
    if files.is_empty() {
        warn!("no CSV files found");
        return Ok(());
    }
    info!(files = files.len(), "processing meter files");

    let client = settings.http.build_client()?;
    let rce_store = RceStore::new(settings.rce_file(), settings.rce_changes_file());
    let rcem = RcemStore::new(settings.rcem_file(), settings.rcem_changes_file()).load();

    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let readings = match meter::read_meter_csv(&path) {
            Ok(r) => r,
            Err(e) => {
                warn!(file = %name, error = %e, "skipping file");
                reports.push(FileReport::failed(name, format!("{:#}", e)));
                continue;
            }
        };
        let Some((first, last)) = meter::span(&readings) else {
            reports.push(FileReport::failed(name, "no valid readings"));
            continue;
        };

        let hourly = match deposit::market_prices(&client, &settings, &rce_store, first, last).await {
            Ok(points) => Ok(hourly_deposit(&readings, &hourly_average(&points), &cfg)),
            Err(e) => Err(format!("{:#}", e)),
        };

        let (year, month) = billing_month(first);
        let monthly = match monthly_price(&rcem, year, month) {
            Some(price) => Ok(monthly_deposit(&readings, price, &cfg)),
            None => Err(format!("no RCEm published for {}-{:02}", year, month)),
        };

        reports.push(FileReport {
            file_name: name,
            start: Some(first.date()),
            hourly,
            monthly,
        });
    }

    print!("{}", report::render(&reports, settings.month_names));
    Ok(())
}
