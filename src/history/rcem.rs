use anyhow::Result;
use std::{collections::BTreeSet, fmt, path::PathBuf};
use tracing::info;

use super::{read_json_or_default, write_json_atomic, write_log};
use crate::process::{count_entries, OutputTable};

/// One (year, month) whose stored price differs between two tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub year: String,
    pub month: String,
    pub old: Option<f64>,
    pub new: Option<f64>,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}: {} -> {}",
            self.year,
            self.month,
            render(self.old),
            render(self.new)
        )
    }
}

fn render(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:?}", v),
        None => "None".to_string(),
    }
}

/// Every key present in either table whose value differs.
/// Years ascend lexically, months numerically.
pub fn diff(old: &OutputTable, new: &OutputTable) -> Vec<Change> {
    let years: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut changes = Vec::new();
    for year in years {
        let old_year = old.get(year);
        let new_year = new.get(year);
        let mut months: Vec<&String> = old_year
            .into_iter()
            .flat_map(|m| m.keys())
            .chain(new_year.into_iter().flat_map(|m| m.keys()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        months.sort_by_key(|m| (m.parse::<u32>().unwrap_or(u32::MAX), m.to_string()));

        for month in months {
            let o = old_year.and_then(|m| m.get(month)).copied();
            let n = new_year.and_then(|m| m.get(month)).copied();
            if o != n {
                changes.push(Change {
                    year: year.clone(),
                    month: month.clone(),
                    old: o,
                    new: n,
                });
            }
        }
    }
    changes
}

/// What [`RcemStore::update`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Stored data already matched; nothing was written.
    Unchanged,
    Written {
        entries: usize,
        changes: Vec<Change>,
    },
}

/// `rcem.json` and its change log.
#[derive(Debug, Clone)]
pub struct RcemStore {
    path: PathBuf,
    changes_path: PathBuf,
}

impl RcemStore {
    pub fn new(path: impl Into<PathBuf>, changes_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            changes_path: changes_path.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Previously stored table; empty if absent or corrupt.
    pub fn load(&self) -> OutputTable {
        read_json_or_default(&self.path)
    }

    /// Replace the stored table with `new` if it differs, logging every changed key.
    pub fn update(&self, new: &OutputTable) -> Result<UpdateOutcome> {
        let old = self.load();
        if &old == new {
            info!("no changes in RCEm data");
            return Ok(UpdateOutcome::Unchanged);
        }
        let changes = diff(&old, new);

        write_json_atomic(&self.path, new)?;
        let entries = count_entries(new);
        info!(path = %self.path.display(), entries, "wrote RCEm data");

        if !changes.is_empty() {
            let lines: Vec<String> = changes.iter().map(Change::to_string).collect();
            write_log(&self.changes_path, &lines)?;
            info!(
                path = %self.changes_path.display(),
                changes = changes.len(),
                "wrote changes log"
            );
        }
        Ok(UpdateOutcome::Written { entries, changes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::insert;
    use std::fs;
    use tempfile::tempdir;

    fn table(entries: &[(&str, u32, f64)]) -> OutputTable {
        let mut t = OutputTable::new();
        for &(y, m, v) in entries {
            insert(&mut t, y, m, v);
        }
        t
    }

    #[test]
    fn test_diff_orders_and_renders() {
        let old = table(&[("2025", 2, 442.02), ("2025", 10, 1.0), ("2024", 12, 470.0)]);
        let new = table(&[("2025", 2, 440.0), ("2025", 10, 1.0), ("2025", 9, 3.0)]);
        let changes = diff(&old, &new);
        let lines: Vec<String> = changes.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "2024-12: 470.0 -> None",
                "2025-2: 442.02 -> 440.0",
                "2025-9: None -> 3.0",
            ]
        );
    }

    #[test]
    fn test_update_writes_then_reports_unchanged() {
        let dir = tempdir().unwrap();
        let store = RcemStore::new(dir.path().join("rcem.json"), dir.path().join("rcem_changes.txt"));
        let data = table(&[("2025", 1, 480.01), ("2025", 2, 440.0)]);

        match store.update(&data).unwrap() {
            UpdateOutcome::Written { entries, changes } => {
                assert_eq!(entries, 2);
                assert_eq!(changes.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(store.load(), data);
        let json = fs::read_to_string(store.path()).unwrap();
        assert!(json.contains("\"2\": 440.0"));

        assert_eq!(store.update(&data).unwrap(), UpdateOutcome::Unchanged);

        let log = fs::read_to_string(dir.path().join("rcem_changes.txt")).unwrap();
        assert_eq!(log, "2025-1: None -> 480.01\n2025-2: None -> 440.0\n");
    }

    #[test]
    fn test_corrupt_store_is_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rcem.json");
        fs::write(&path, "garbage").unwrap();
        let store = RcemStore::new(&path, dir.path().join("changes.txt"));
        assert!(store.load().is_empty());

        let data = table(&[("2023", 12, 305.15)]);
        assert!(matches!(
            store.update(&data).unwrap(),
            UpdateOutcome::Written { entries: 1, .. }
        ));
        assert_eq!(store.load(), data);
    }
}
