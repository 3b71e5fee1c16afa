use tracing::trace;

use super::scan::{Correction, MonthGroup};
use super::utils::round2;

/// Pick the correction that supersedes the base value.
///
/// Every correction takes part, dated or not. The pool is stably sorted by date
/// with undated entries first, and the last one wins.
pub fn choose_correction(corrections: &[Correction]) -> Option<&Correction> {
    let mut pool: Vec<&Correction> = corrections.iter().collect();
    pool.sort_by_key(|c| c.date);
    pool.last().copied()
}

/// Effective price for a month group, rounded to 2 decimals.
pub fn effective_value(group: &MonthGroup) -> Option<f64> {
    let chosen = choose_correction(&group.corrections);
    if let Some(c) = chosen {
        trace!(
            month = group.month,
            base = ?group.base_value,
            base_date = ?group.base_date,
            correction = c.value,
            correction_date = ?c.date,
            "correction supersedes base"
        );
    }
    chosen
        .map(|c| c.value)
        .or(group.base_value)
        .map(round2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn group(base: Option<f64>, base_date: Option<NaiveDate>, corr: &[(f64, Option<NaiveDate>)]) -> MonthGroup {
        MonthGroup {
            month: 1,
            base_value: base,
            base_date,
            corrections: corr
                .iter()
                .map(|&(value, date)| Correction { value, date })
                .collect(),
        }
    }

    #[test]
    fn test_base_only() {
        assert_eq!(effective_value(&group(Some(480.014), ymd(2025, 2, 11), &[])), Some(480.01));
        assert_eq!(effective_value(&group(None, None, &[])), None);
    }

    #[test]
    fn test_later_correction_wins() {
        let g = group(Some(442.02), ymd(2025, 3, 11), &[(440.0, ymd(2025, 4, 11))]);
        assert_eq!(effective_value(&g), Some(440.0));
    }

    #[test]
    fn test_latest_dated_correction_wins_regardless_of_order() {
        let g = group(
            Some(300.0),
            ymd(2024, 3, 11),
            &[
                (310.0, ymd(2025, 3, 11)),
                (305.0, ymd(2024, 6, 11)),
                (301.0, ymd(2024, 4, 11)),
            ],
        );
        assert_eq!(effective_value(&g), Some(310.0));
    }

    #[test]
    fn test_undated_corrections_stay_in_pool() {
        // lone undated correction sorts last
        let g = group(Some(300.0), ymd(2024, 3, 11), &[(299.5, None)]);
        assert_eq!(effective_value(&g), Some(299.5));

        // a dated one sorts after it
        let g = group(Some(300.0), ymd(2024, 3, 11), &[(299.5, None), (298.0, ymd(2024, 1, 1))]);
        assert_eq!(effective_value(&g), Some(298.0));

        // several undated keep document order, last one wins
        let g = group(None, None, &[(1.0, None), (2.0, None)]);
        assert_eq!(effective_value(&g), Some(2.0));
    }

    #[test]
    fn test_equal_dates_resolved_by_sort_rule() {
        // a lone correction dated like the base still sorts last
        let g = group(Some(500.0), ymd(2025, 2, 11), &[(490.0, ymd(2025, 2, 11))]);
        assert_eq!(effective_value(&g), Some(490.0));

        // ties keep document order, so the later row is last
        let g = group(
            Some(500.0),
            ymd(2025, 2, 11),
            &[(495.0, ymd(2025, 5, 11)), (490.0, ymd(2025, 5, 11)), (480.0, ymd(2025, 3, 11))],
        );
        assert_eq!(effective_value(&g), Some(490.0));
    }

    #[test]
    fn test_correction_without_base() {
        let g = group(None, None, &[(123.456, ymd(2024, 1, 1))]);
        assert_eq!(effective_value(&g), Some(123.46));
    }
}
