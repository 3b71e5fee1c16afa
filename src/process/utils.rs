/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a published figure such as `"480,01"` or `"1 017,27 zł"` into an `f64`.
///
/// Everything except digits, `,`, `.` and `-` is dropped and decimal commas become
/// dots. Empty or unparsable input yields `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let kept: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if kept.is_empty() {
        return None;
    }
    kept.parse::<f64>().ok()
}

/// Round to two decimal places, the precision every stored price carries.
/// Exact halves go to the even neighbour.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}
