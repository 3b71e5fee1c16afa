/// One `<tr>` worth of cell text, in column order.
pub type RawRow = Vec<String>;

/// A table lifted out of the published page, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Each row as a Vec of cell strings (one per `th`/`td`), already trimmed.
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }
}

impl From<Vec<Vec<&str>>> for RawTable {
    fn from(rows: Vec<Vec<&str>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }
}

/// Lowercased, trimmed text of the first cell, if the row has any cells.
pub fn first_label(row: &[String]) -> Option<String> {
    row.first().map(|c| c.trim().to_lowercase())
}
