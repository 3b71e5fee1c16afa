// src/process/mod.rs
//! Turns the published RCEm tables into a year → month → price lookup.
//!
//! Pure and synchronous: the input is an already extracted document and nothing
//! here touches the network or the filesystem.

pub mod date_parser;
pub mod months;
pub mod raw_table;
pub mod resolve;
pub mod scan;
pub mod utils;

use std::collections::BTreeMap;
use tracing::{debug, info};

pub use months::{month_from_label, MonthNames};
pub use raw_table::{RawRow, RawTable};
pub use scan::{Correction, MonthGroup, TableScan};

/// Month number as a string (`"1"`..`"12"`) → effective price.
pub type YearPrices = BTreeMap<String, f64>;

/// Four-digit year → its months, the persisted `rcem.json` shape.
pub type OutputTable = BTreeMap<String, YearPrices>;

/// Resolve every month group of every table that carries a year marker.
#[tracing::instrument(level = "debug", skip(tables), fields(count = tables.len()))]
pub fn parse_document(tables: &[RawTable]) -> OutputTable {
    let mut out = OutputTable::new();
    for table in tables {
        let Some(scan) = scan::scan_table(table) else {
            continue;
        };
        for group in &scan.groups {
            match resolve::effective_value(group) {
                Some(value) => insert(&mut out, &scan.year, group.month, value),
                None => debug!(year = %scan.year, month = group.month, "no value for month"),
            }
        }
    }
    info!(
        years = out.len(),
        entries = count_entries(&out),
        "parsed RCEm tables"
    );
    out
}

/// Extract the tables of an HTML page and parse them.
pub fn parse_html(html: &str) -> OutputTable {
    parse_document(&crate::fetch::page::extract_tables(html))
}

/// Store one resolved price; a repeated month overwrites the earlier one.
pub fn insert(out: &mut OutputTable, year: &str, month: u32, value: f64) {
    out.entry(year.to_string())
        .or_default()
        .insert(month.to_string(), value);
}

/// Total number of (year, month) entries.
pub fn count_entries(table: &OutputTable) -> usize {
    table.values().map(BTreeMap::len).sum()
}
