use chrono::NaiveDate;
use tracing::{debug, trace};

use super::date_parser::parse_date;
use super::months::month_from_label;
use super::raw_table::{first_label, RawRow, RawTable};
use super::utils::parse_number;

/// How many leading rows may carry the table's year.
pub const YEAR_SEARCH_ROWS: usize = 4;

/// A retroactive revision of a month's price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub value: f64,
    pub date: Option<NaiveDate>,
}

/// One month label plus the rows that belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGroup {
    pub month: u32,
    pub base_value: Option<f64>,
    pub base_date: Option<NaiveDate>,
    pub corrections: Vec<Correction>,
}

impl MonthGroup {
    fn new(month: u32) -> Self {
        Self {
            month,
            base_value: None,
            base_date: None,
            corrections: Vec::new(),
        }
    }
}

/// Month groups found in one table, tagged with its year.
#[derive(Debug, Clone, PartialEq)]
pub struct TableScan {
    pub year: String,
    pub groups: Vec<MonthGroup>,
}

#[derive(Debug, PartialEq, Eq)]
enum ScanState {
    SeekYear,
    ScanRows { year: String },
}

/// Run the year search and then the row scan over `table`.
///
/// Returns `None` when no year marker is present in the leading rows; such a
/// table is not an error, it simply contributes nothing.
pub fn scan_table(table: &RawTable) -> Option<TableScan> {
    let mut state = ScanState::SeekYear;
    loop {
        state = match state {
            ScanState::SeekYear => match seek_year(&table.rows) {
                Some(year) => ScanState::ScanRows { year },
                None => {
                    debug!(rows = table.rows.len(), "no year marker; skipping table");
                    return None;
                }
            },
            ScanState::ScanRows { year } => {
                let groups = scan_rows(&table.rows);
                debug!(year = %year, groups = groups.len(), "scanned table");
                return Some(TableScan { year, groups });
            }
        };
    }
}

/// First cell among the leading rows whose text is exactly four digits.
pub fn seek_year(rows: &[RawRow]) -> Option<String> {
    rows.iter()
        .take(YEAR_SEARCH_ROWS)
        .flat_map(|row| row.iter())
        .map(|cell| cell.trim())
        .find(|txt| txt.len() == 4 && txt.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

/// Segment `rows` into month groups, in document order.
pub fn scan_rows(rows: &[RawRow]) -> Vec<MonthGroup> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < rows.len() {
        let Some(month) = row_month(&rows[i]) else {
            i += 1;
            continue;
        };

        let mut group = MonthGroup::new(month);
        let mut cursor = i + 1;
        if let Some(row) = rows.get(cursor) {
            if is_base_row(row) {
                (group.base_value, group.base_date) = value_and_date(row);
                cursor += 1;
            }
        }

        let (corrections, stop) = collect_corrections(rows, cursor);
        group.corrections = corrections;
        trace!(
            month,
            base = ?group.base_value,
            corrections = group.corrections.len(),
            "month group"
        );
        groups.push(group);
        // the stop row is the next month label
        i = stop;
    }
    groups
}

/// Gather correction rows from `start` until the next month label.
///
/// Returns the corrections with a parsable value and the index of the row that
/// ended the scan (`rows.len()` when the table ran out). That row is not consumed.
pub fn collect_corrections(rows: &[RawRow], start: usize) -> (Vec<Correction>, usize) {
    let mut corrections = Vec::new();
    let mut m = start;
    while m < rows.len() {
        let row = &rows[m];
        let Some(label) = first_label(row) else {
            m += 1;
            continue;
        };
        if month_from_label(&label).is_some() {
            break;
        }
        if label.contains("skorygowana") && label.contains("rcem") {
            match value_and_date(row) {
                (Some(value), date) => corrections.push(Correction { value, date }),
                (None, _) => trace!(row = m, "correction without a value dropped"),
            }
        }
        m += 1;
    }
    (corrections, m)
}

fn row_month(row: &[String]) -> Option<u32> {
    first_label(row).and_then(|label| month_from_label(&label))
}

fn is_base_row(row: &[String]) -> bool {
    match first_label(row) {
        Some(label) => label.contains("rcem") && month_from_label(&label).is_none(),
        None => false,
    }
}

/// Cells two and three of a value row: the price and its publication date.
fn value_and_date(row: &[String]) -> (Option<f64>, Option<NaiveDate>) {
    let value = row.get(1).and_then(|c| parse_number(c));
    let date = row.get(2).and_then(|c| parse_date(c));
    (value, date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<RawRow> {
        raw.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_seek_year_only_in_leading_rows() {
        let found = rows(&[&["RCEm"], &["", "2024"], &["styczeń"]]);
        assert_eq!(seek_year(&found), Some("2024".to_string()));

        let late = rows(&[&["a"], &["b"], &["c"], &["d"], &["2024"]]);
        assert_eq!(seek_year(&late), None);

        let not_exact = rows(&[&["rok 2024"], &["20245"]]);
        assert_eq!(seek_year(&not_exact), None);
    }

    #[test]
    fn test_table_without_year_is_skipped() {
        let table = RawTable::from(vec![
            vec!["styczeń"],
            vec!["RCEm", "480,01", "11.02.2025"],
        ]);
        assert_eq!(scan_table(&table), None);
        assert_eq!(scan_table(&RawTable::default()), None);
    }

    #[test]
    fn test_groups_with_base_and_corrections() {
        let table = RawTable::from(vec![
            vec!["2025"],
            vec!["styczeń"],
            vec!["RCEm", "480,01", "11.02.2025"],
            vec!["skorygowana RCEm*", "-", "-"],
            vec!["luty"],
            vec!["RCEm", "442,02", "11.03.2025"],
            vec!["skorygowana RCEm*", "440,00", "11.04.2025"],
        ]);
        let scan = scan_table(&table).unwrap();
        assert_eq!(scan.year, "2025");
        assert_eq!(scan.groups.len(), 2);

        let jan = &scan.groups[0];
        assert_eq!(jan.month, 1);
        assert_eq!(jan.base_value, Some(480.01));
        assert_eq!(jan.base_date, Some(ymd(2025, 2, 11)));
        assert!(jan.corrections.is_empty());

        let feb = &scan.groups[1];
        assert_eq!(feb.month, 2);
        assert_eq!(
            feb.corrections,
            vec![Correction {
                value: 440.0,
                date: Some(ymd(2025, 4, 11))
            }]
        );
    }

    #[test]
    fn test_correction_scan_stops_at_next_month_label() {
        let table = rows(&[
            &["skorygowana RCEm", "1,00", "01.01.2025"],
            &["uwagi"],
            &[],
            &["skorygowana RCEm", "2,00", "-"],
            &["Marzec"],
            &["skorygowana RCEm", "3,00", "01.02.2025"],
        ]);
        let (found, stop) = collect_corrections(&table, 0);
        assert_eq!(stop, 4);
        assert_eq!(
            found,
            vec![
                Correction {
                    value: 1.0,
                    date: Some(ymd(2025, 1, 1))
                },
                Correction {
                    value: 2.0,
                    date: None
                },
            ]
        );

        let (rest, stop) = collect_corrections(&table, 5);
        assert_eq!(stop, table.len());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_missing_base_row_and_adjacent_labels() {
        let table = rows(&[
            &["2023"],
            &["kwiecień"],
            &["maj"],
            &["RCEm", "216,97"],
            &["skorygowana RCEm", "210,00", "11.09.2023"],
        ]);
        let groups = scan_rows(&table);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].month, 4);
        assert_eq!(groups[0].base_value, None);
        assert!(groups[0].corrections.is_empty());
        assert_eq!(groups[1].month, 5);
        assert_eq!(groups[1].base_value, Some(216.97));
        assert_eq!(groups[1].base_date, None);
        assert_eq!(groups[1].corrections.len(), 1);
    }

    #[test]
    fn test_non_base_lookahead_row_starts_correction_scan() {
        let table = rows(&[
            &["2024"],
            &["czerwiec"],
            &["uwagi"],
            &["skorygowana RCEm", "301,50", "10.08.2024"],
            &["lipiec"],
            &["RCEm", "320,00", "09.08.2024"],
        ]);
        let groups = scan_rows(&table);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].month, 6);
        assert_eq!(groups[0].base_value, None);
        assert_eq!(
            groups[0].corrections,
            vec![Correction {
                value: 301.5,
                date: Some(ymd(2024, 8, 10))
            }]
        );
        assert_eq!(groups[1].month, 7);
        assert_eq!(groups[1].base_value, Some(320.0));
    }
}
