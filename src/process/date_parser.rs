use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("date pattern is valid"));

/// Find a `dd.mm.yyyy` publication date anywhere in `s`.
///
/// Empty text and the `-` placeholder mean "not published". Footnote markers and
/// other annotations around the date are tolerated; an impossible calendar date
/// yields `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let caps = DAY_MONTH_YEAR.captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plain_and_annotated_dates() {
        assert_eq!(parse_date("11.02.2025"), Some(ymd(2025, 2, 11)));
        assert_eq!(parse_date("1.3.2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("*11.04.2025 r."), Some(ymd(2025, 4, 11)));
        assert_eq!(parse_date("11.04.2025 12:00"), Some(ymd(2025, 4, 11)));
    }

    #[test]
    fn test_placeholders_and_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date(" - "), None);
        assert_eq!(parse_date("brak"), None);
        assert_eq!(parse_date("2025-04-11"), None);
        assert_eq!(parse_date("31.02.2025"), None);
    }
}
