use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

use crate::config::ClassificationMode;
use crate::report::Report;

// ---------------------------------------------------------------------------
// Cells + tables
// ---------------------------------------------------------------------------

/// An untyped spreadsheet cell. `Empty` is the missing-value sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Comparison rule shared by aggregation and classification: equal values
    /// of the same kind match, two missing cells match, two empty strings
    /// match. Values of different kinds never match.
    pub fn matches(&self, other: &CellValue) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => {
                // Integers without decimals
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Self::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Self::Date(dt) => {
                if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

/// Header row plus data rows. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Append a row, padding short rows with `Empty` and dropping cells past
    /// the last header.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.headers.len(), CellValue::Empty);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Classification records
// ---------------------------------------------------------------------------

/// One (key, mapped column) observation in per-field mode.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    /// Position of the row within the aligned set.
    pub position: usize,
    /// Position of the column pair within the mapping.
    pub column: usize,
    pub key: CellValue,
    pub source_column: String,
    pub source_value: CellValue,
    pub target_value: CellValue,
}

/// One whole-row observation in per-row mode. `cells` follow the sheet
/// headers after the leading key column.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub key: CellValue,
    pub cells: Vec<CellValue>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Match statistics for one mapped column pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub field: String,
    pub source_column: String,
    pub target_column: String,
    pub total_rows: usize,
    pub correct_rows: usize,
    pub incorrect_rows: usize,
    pub percentage_correct: f64,
    pub percentage_incorrect: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallout: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub source_rows: usize,
    pub target_rows: usize,
    pub aligned_rows: usize,
    pub fallout: usize,
    pub difference_keys: usize,
    pub similarity_keys: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareMeta {
    pub config_name: String,
    pub mode: ClassificationMode,
    pub engine_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub meta: CompareMeta,
    pub stats: RunStats,
    pub columns: Vec<ColumnSummary>,
    #[serde(skip)]
    pub report: Report,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn matches_missing_and_empty_strings() {
        assert!(CellValue::Empty.matches(&CellValue::Empty));
        assert!(CellValue::text("").matches(&CellValue::text("")));
        assert!(!CellValue::Empty.matches(&CellValue::text("")));
    }

    #[test]
    fn matches_never_crosses_kinds() {
        assert!(!CellValue::text("1").matches(&CellValue::Number(1.0)));
        assert!(!CellValue::Bool(true).matches(&CellValue::Number(1.0)));
        assert!(CellValue::Number(2.5).matches(&CellValue::Number(2.5)));
    }

    #[test]
    fn display_formats() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(1.25).to_string(), "1.25");
        assert_eq!(CellValue::Bool(false).to_string(), "FALSE");
        assert_eq!(CellValue::Empty.to_string(), "");

        let day = NaiveDate::from_ymd_opt(2024, 10, 11).unwrap();
        assert_eq!(CellValue::Date(day.and_hms_opt(0, 0, 0).unwrap()).to_string(), "2024-10-11");
        assert_eq!(
            CellValue::Date(day.and_hms_opt(9, 30, 0).unwrap()).to_string(),
            "2024-10-11 09:30:00"
        );
    }

    #[test]
    fn push_row_pads_and_truncates() {
        let mut table = Table::new(vec!["K".into(), "A".into()]);
        table.push_row(vec![CellValue::Number(1.0)]);
        table.push_row(vec![CellValue::Number(2.0), CellValue::text("x"), CellValue::text("extra")]);
        assert_eq!(table.rows[0], vec![CellValue::Number(1.0), CellValue::Empty]);
        assert_eq!(table.rows[1].len(), 2);
        assert_eq!(table.cell(5, 5), &CellValue::Empty);
    }
}
