// src/deposit/meter.rs
//! Energy readings exported by the grid operator's customer portal.

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDateTime, Timelike};
use csv::ReaderBuilder;
use std::{fs::File, io::Read, path::Path};
use tracing::{debug, instrument};

use crate::process::utils::{clean_str, parse_number};

pub const DATE_COLUMN: &str = "Data";
pub const ENERGY_COLUMN: &str = "Wartość kWh";

/// Energy fed into (positive) or drawn from the grid during one hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub at: NaiveDateTime,
    pub energy_kwh: f64,
}

#[instrument(level = "debug", skip(path), fields(file = %path.as_ref().display()))]
pub fn read_meter_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Reading>> {
    let file = File::open(&path)
        .with_context(|| format!("opening meter file {}", path.as_ref().display()))?;
    parse_meter_csv(file).with_context(|| format!("parsing {}", path.as_ref().display()))
}

/// Parse a `;`-separated export with `Data` and `Wartość kWh` columns.
///
/// Rows with an empty, undecodable or unreadable timestamp or energy are
/// skipped. A file lacking either column is an error.
pub fn parse_meter_csv<R: Read>(reader: R) -> Result<Vec<Reading>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(clean_str).collect();
    let date_idx = headers.iter().position(|h| h == DATE_COLUMN);
    let energy_idx = headers.iter().position(|h| h == ENERGY_COLUMN);
    let (Some(date_idx), Some(energy_idx)) = (date_idx, energy_idx) else {
        bail!(
            "missing required columns `{}` and `{}` (found {:?})",
            DATE_COLUMN,
            ENERGY_COLUMN,
            headers
        );
    };

    let mut readings = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.byte_records() {
        let record = record.context("reading meter CSV record")?;
        let field = |idx: usize| record.get(idx).and_then(|b| std::str::from_utf8(b).ok());
        let at = field(date_idx).and_then(parse_timestamp);
        let energy = field(energy_idx).and_then(parse_number);
        match (at, energy) {
            (Some(at), Some(energy_kwh)) => readings.push(Reading { at, energy_kwh }),
            _ => skipped += 1,
        }
    }
    debug!(readings = readings.len(), skipped, "parsed meter rows");
    Ok(readings)
}

/// Parse a reading timestamp and truncate it to the hour.
///
/// `24:00` is the end of the day and becomes `00:00` of the following day.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%d.%m.%Y %H:%M:%S",
    ];
    let raw = clean_str(raw);
    if raw.is_empty() {
        return None;
    }
    let end_of_day = raw.contains(" 24:00");
    let normalised = raw.replace(" 24:00", " 00:00");
    let mut at = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalised, fmt).ok())?;
    if end_of_day {
        at += Duration::days(1);
    }
    at.with_minute(0)?.with_second(0)
}

/// Earliest and latest reading time.
pub fn span(readings: &[Reading]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let min = readings.iter().map(|r| r.at).min()?;
    let max = readings.iter().map(|r| r.at).max()?;
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2025-01-01 13:00"), Some(at(2025, 1, 1, 13)));
        assert_eq!(parse_timestamp("2025-01-01 13:45:10"), Some(at(2025, 1, 1, 13)));
        assert_eq!(parse_timestamp("31.01.2025 24:00"), Some(at(2025, 2, 1, 0)));
        assert_eq!(parse_timestamp("2024-12-31 24:00"), Some(at(2025, 1, 1, 0)));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("jutro"), None);
    }

    #[test]
    fn test_parse_meter_csv() {
        let csv = "Data; Wartość kWh ;Status\n\
                   2025-01-01 01:00;0,125;OK\n\
                   2025-01-01 02:00;;OK\n\
                   ;1,0;OK\n\
                   2025-01-01 24:00;-0,5;OK\n";
        let readings = parse_meter_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            readings,
            vec![
                Reading { at: at(2025, 1, 1, 1), energy_kwh: 0.125 },
                Reading { at: at(2025, 1, 2, 0), energy_kwh: -0.5 },
            ]
        );
        assert_eq!(span(&readings), Some((at(2025, 1, 1, 1), at(2025, 1, 2, 0))));
    }

    #[test]
    fn test_row_with_invalid_utf8_is_skipped() {
        let mut csv = "Data;Wartość kWh\n".as_bytes().to_vec();
        csv.extend_from_slice(b"2025-01-01 01:00;0,5\n");
        csv.extend_from_slice(b"2025-01-01 02:00;0,5 \xff\n");
        csv.extend_from_slice(b"2025-01-01 03:00;1,0\n");
        let readings = parse_meter_csv(csv.as_slice()).unwrap();
        assert_eq!(
            readings,
            vec![
                Reading { at: at(2025, 1, 1, 1), energy_kwh: 0.5 },
                Reading { at: at(2025, 1, 1, 3), energy_kwh: 1.0 },
            ]
        );
    }

    #[test]
    fn test_missing_columns() {
        let err = parse_meter_csv("Czas;kWh\n2025-01-01 01:00;1\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing required columns"));
        assert_eq!(span(&[]), None);
    }
}
