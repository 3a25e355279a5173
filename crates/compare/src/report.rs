// Report sheets: shaped tables handed to the writer.

use crate::config::ClassificationMode;
use crate::model::{CellValue, ColumnSummary};

pub const SUMMARY_SHEET: &str = "Summary";
pub const DIFFERENCES_SHEET: &str = "Differences";
pub const SIMILARITIES_SHEET: &str = "Similarities";

/// Characters added to the widest value of each column.
pub const WIDTH_PADDING: usize = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn header_only(name: impl Into<String>, headers: &[&str]) -> Self {
        Self::new(name, headers.iter().map(|h| h.to_string()).collect())
    }

    /// Auto-fit width per column: longest rendered value, header included,
    /// plus `WIDTH_PADDING`.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (col, cell) in row.iter().enumerate() {
                let len = cell.to_string().chars().count();
                match widths.get_mut(col) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths.into_iter().map(|w| w + WIDTH_PADDING).collect()
    }
}

/// The three-sheet comparison report, in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub sheets: Vec<Sheet>,
}

impl Report {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// One row per mapped pair. Fallout is only reported in per-field mode.
pub fn summary_sheet(columns: &[ColumnSummary], mode: ClassificationMode) -> Sheet {
    let mut headers = vec![
        "Field Comparison",
        "Total Rows",
        "Correct Rows",
        "Incorrect Rows",
        "Percentage Correct",
        "Percentage_Incorrect",
    ];
    let with_fallout = mode == ClassificationMode::PerField;
    if with_fallout {
        headers.push("Fallout");
    }

    let mut sheet = Sheet::header_only(SUMMARY_SHEET, &headers);
    for c in columns {
        let mut row = vec![
            CellValue::text(c.field.as_str()),
            CellValue::Number(c.total_rows as f64),
            CellValue::Number(c.correct_rows as f64),
            CellValue::Number(c.incorrect_rows as f64),
            CellValue::Number(c.percentage_correct),
            CellValue::Number(c.percentage_incorrect),
        ];
        if with_fallout {
            row.push(CellValue::Number(c.fallout.unwrap_or(0) as f64));
        }
        sheet.rows.push(row);
    }
    sheet
}
