use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use std::{collections::BTreeMap, path::PathBuf};
use tracing::info;

use super::{read_json_or_default, write_json_atomic, write_log};
use crate::fetch::rce::PricePoint;

/// ISO timestamp (`2025-01-01T00:15:00`) → price in PLN/kWh.
pub type HourlyPrices = BTreeMap<String, f64>;

const KEY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn key_for(at: NaiveDateTime) -> String {
    at.format(KEY_FORMAT).to_string()
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

/// Result of [`RceStore::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    NothingNew,
    Appended(usize),
}

/// `rce.json`: append-only store of market prices keyed by timestamp.
#[derive(Debug, Clone)]
pub struct RceStore {
    path: PathBuf,
    changes_path: PathBuf,
}

impl RceStore {
    pub fn new(path: impl Into<PathBuf>, changes_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            changes_path: changes_path.into(),
        }
    }

    pub fn load(&self) -> HourlyPrices {
        read_json_or_default(&self.path)
    }

    /// Stored prices with timestamps in `[from, to]`, sorted.
    pub fn points_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<PricePoint> {
        let mut points: Vec<PricePoint> = self
            .load()
            .into_iter()
            .filter_map(|(k, v)| {
                let at = NaiveDateTime::parse_from_str(&k, KEY_FORMAT).ok()?;
                (at >= from && at <= to).then(|| PricePoint {
                    at,
                    pln_per_kwh: v.max(0.0),
                })
            })
            .collect();
        points.sort_by_key(|p| p.at);
        points
    }

    /// Add every point whose timestamp is not stored yet. Existing keys keep their value.
    pub fn merge(&self, points: &[PricePoint]) -> Result<MergeOutcome> {
        let mut existing = self.load();
        let mut added = 0;
        for p in points {
            let key = key_for(p.at);
            if !existing.contains_key(&key) {
                existing.insert(key, round6(p.pln_per_kwh));
                added += 1;
            }
        }
        if added == 0 {
            info!("no new hourly entries to append");
            return Ok(MergeOutcome::NothingNew);
        }

        write_json_atomic(&self.path, &existing)?;
        write_log(
            &self.changes_path,
            &[format!(
                "Appended {} entries on {}",
                added,
                Utc::now().to_rfc3339()
            )],
        )?;
        info!(added, path = %self.path.display(), "appended hourly entries");
        Ok(MergeOutcome::Appended(added))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_merge_appends_only_missing_keys() {
        let dir = tempdir().unwrap();
        let store = RceStore::new(dir.path().join("rce.json"), dir.path().join("rce_changes.txt"));

        let first = [
            PricePoint { at: at(1, 0, 0), pln_per_kwh: 0.41234567 },
            PricePoint { at: at(1, 0, 15), pln_per_kwh: 0.4 },
        ];
        assert_eq!(store.merge(&first).unwrap(), MergeOutcome::Appended(2));

        let second = [
            PricePoint { at: at(1, 0, 0), pln_per_kwh: 9.0 },
            PricePoint { at: at(1, 0, 30), pln_per_kwh: 0.3 },
        ];
        assert_eq!(store.merge(&second).unwrap(), MergeOutcome::Appended(1));
        assert_eq!(store.merge(&second).unwrap(), MergeOutcome::NothingNew);

        let stored = store.load();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored["2025-01-01T00:00:00"], 0.412346);

        let log = fs::read_to_string(dir.path().join("rce_changes.txt")).unwrap();
        assert!(log.starts_with("Appended 1 entries on "));
    }

    #[test]
    fn test_points_between() {
        let dir = tempdir().unwrap();
        let store = RceStore::new(dir.path().join("rce.json"), dir.path().join("log.txt"));
        store
            .merge(&[
                PricePoint { at: at(1, 23, 45), pln_per_kwh: 0.1 },
                PricePoint { at: at(2, 0, 0), pln_per_kwh: 0.2 },
                PricePoint { at: at(3, 0, 0), pln_per_kwh: 0.3 },
            ])
            .unwrap();
        let got = store.points_between(at(2, 0, 0), at(2, 23, 59));
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].pln_per_kwh, 0.2);
    }
}
