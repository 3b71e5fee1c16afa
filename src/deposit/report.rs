use chrono::{Datelike, NaiveDate};

use super::DepositResult;
use crate::process::MonthNames;

/// A method either produced a value or failed with a reason.
pub type MethodOutcome = Result<DepositResult, String>;

/// Everything computed for one meter file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file_name: String,
    pub start: Option<NaiveDate>,
    pub hourly: MethodOutcome,
    pub monthly: MethodOutcome,
}

impl FileReport {
    /// A file that could not be read at all.
    pub fn failed(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            file_name: file_name.into(),
            start: None,
            hourly: Err(reason.clone()),
            monthly: Err(reason),
        }
    }
}

const RULE: &str = "------------------------------------------------------------";

fn totals<'a>(results: impl Iterator<Item = &'a DepositResult>) -> Option<(f64, f64)> {
    let mut any = false;
    let (mut energy, mut value) = (0.0, 0.0);
    for r in results {
        any = true;
        energy += r.total_energy_kwh;
        value += r.total_value_pln;
    }
    any.then_some((energy, value))
}

fn method_line(out: &mut String, label: &str, outcome: &MethodOutcome) {
    match outcome {
        Ok(r) => {
            out.push_str(&format!(
                " {}: {:.3} kWh, deposit {:.2} PLN",
                label, r.total_energy_kwh, r.total_value_pln
            ));
            if let Some(price) = r.monthly_price {
                out.push_str(&format!(" at {:.5} PLN/kWh", price));
            }
            if r.multiplier_applied {
                out.push_str(" (multiplier applied)");
            }
            out.push('\n');
        }
        Err(reason) => {
            out.push_str(&format!(" {}: error: {}\n", label, reason));
        }
    }
}

/// Plain-text summary, files in chronological order, with per-method totals.
pub fn render(reports: &[FileReport], names: MonthNames) -> String {
    let mut sorted: Vec<&FileReport> = reports.iter().collect();
    sorted.sort_by_key(|r| r.start);

    let mut out = String::new();
    out.push_str("==================== DEPOSIT SUMMARY =======================\n");
    if sorted.is_empty() {
        out.push_str("No files were processed.\n");
    }
    for r in &sorted {
        out.push_str(RULE);
        out.push('\n');
        out.push_str(&format!(" File: {}\n", r.file_name));
        let heading = r
            .start
            .map(|d| names.heading(d.year(), d.month()))
            .unwrap_or_else(|| "no date".to_string());
        out.push_str(&format!(" Month: {}\n", heading));
        method_line(&mut out, "RCE (hourly)", &r.hourly);
        method_line(&mut out, "RCEm (monthly)", &r.monthly);
    }

    let hourly = totals(sorted.iter().filter_map(|r| r.hourly.as_ref().ok()));
    let monthly = totals(sorted.iter().filter_map(|r| r.monthly.as_ref().ok()));
    if hourly.is_some() || monthly.is_some() {
        out.push_str(RULE);
        out.push('\n');
    }
    if let Some((energy, value)) = hourly {
        out.push_str(&format!(" Total RCE: {:.3} kWh, {:.2} PLN\n", energy, value));
    }
    if let Some((energy, value)) = monthly {
        out.push_str(&format!(" Total RCEm: {:.3} kWh, {:.2} PLN\n", energy, value));
    }
    if let (Some((_, h)), Some((_, m))) = (hourly, monthly) {
        let diff = m - h;
        if h != 0.0 {
            let pct = diff / h * 100.0;
            out.push_str(&format!(
                " Difference (RCEm - RCE): {:+.2} PLN ({:+.1}%)\n",
                diff, pct
            ));
        } else {
            out.push_str(&format!(" Difference (RCEm - RCE): {:+.2} PLN\n", diff));
        }
    }
    out.push_str("============================================================\n");
    out
}
