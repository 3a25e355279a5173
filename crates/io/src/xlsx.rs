// Excel import (xlsx, xls, xlsb, ods) and report export (xlsx)

use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use fieldcheck_compare::normalize::{from_serial, parse_datetime};
use fieldcheck_compare::report::{Report, Sheet};
use fieldcheck_compare::CellValue;

/// Widest column Excel accepts, in characters.
pub const MAX_COLUMN_WIDTH: usize = 255;

/// Longest text an xlsx cell holds, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Read one sheet into a grid of typed cells, header row included.
///
/// Reads the first sheet unless `sheet` names another one.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<CellValue>>, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| format!("sheet '{}' not found (have: {})", name, sheet_names.join(", ")))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let grid: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    log::debug!(
        "{}: read {} row(s) from sheet '{}'",
        path.display(),
        grid.len(),
        sheet_name
    );
    Ok(grid)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) if n.is_nan() => CellValue::Empty,
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(e.to_string()),
        // Assumes the 1900 date system, like most workbooks
        Data::DateTime(dt) => match from_serial(dt.as_f64()) {
            Some(value) => CellValue::Date(value),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_datetime(s) {
            Some(value) => CellValue::Date(value),
            None => CellValue::Text(s.clone()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Statistics from writing a report.
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub cells_exported: usize,
    /// Columns left at the default width because the writer rejected the computed one
    pub width_fallbacks: usize,
    pub export_duration_ms: u128,
}

impl ExportResult {
    pub fn summary(&self) -> String {
        format!(
            "{} sheet(s), {} cell(s) in {}ms",
            self.sheets_exported, self.cells_exported, self.export_duration_ms
        )
    }
}

/// Write every report sheet, in order, with bold headers and auto-fit columns.
pub fn export_report(report: &Report, path: &Path) -> Result<ExportResult, String> {
    let start_time = Instant::now();
    let mut result = ExportResult::default();

    let mut xlsx_workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    for sheet in &report.sheets {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet.name, e))?;

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet
                .write_string_with_format(0, column_index(sheet, col)?, header, &header_format)
                .map_err(|e| format!("Failed to write header '{}': {}", header, e))?;
        }

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            let row32 = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col16 = column_index(sheet, col)?;
                let written = match cell {
                    CellValue::Empty => continue,
                    CellValue::Text(s) => {
                        worksheet.write_string(row32, col16, fit_cell_text(s, &sheet.name, row32, col))
                    }
                    CellValue::Number(n) => worksheet.write_number(row32, col16, *n),
                    CellValue::Bool(b) => worksheet.write_boolean(row32, col16, *b),
                    CellValue::Date(dt) => {
                        let format = if dt.time().num_seconds_from_midnight() == 0 {
                            &date_format
                        } else {
                            &datetime_format
                        };
                        match to_serial(dt) {
                            Some(serial) => worksheet.write_number_with_format(row32, col16, serial, format),
                            None => worksheet.write_string(row32, col16, cell.to_string()),
                        }
                    }
                };
                written.map_err(|e| {
                    format!("Failed to write cell ({}, {}) in '{}': {}", row32, col, sheet.name, e)
                })?;
                result.cells_exported += 1;
            }
        }

        result.width_fallbacks += apply_column_widths(worksheet, sheet);
        result.sheets_exported += 1;
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;

    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok(result)
}

/// Set each column to its auto-fit width, capped at `MAX_COLUMN_WIDTH`.
/// Returns how many columns kept the default width.
fn apply_column_widths(worksheet: &mut Worksheet, sheet: &Sheet) -> usize {
    let mut fallbacks = 0;
    for (col, width) in sheet.column_widths().into_iter().enumerate() {
        let Ok(col16) = u16::try_from(col) else {
            break;
        };
        let width = width.min(MAX_COLUMN_WIDTH);
        if let Err(e) = worksheet.set_column_width(col16, width as f64) {
            log::warn!(
                "sheet '{}': could not set width of column {}: {}; using default width",
                sheet.name,
                col,
                e
            );
            fallbacks += 1;
        }
    }
    fallbacks
}

fn column_index(sheet: &Sheet, col: usize) -> Result<u16, String> {
    u16::try_from(col).map_err(|_| {
        format!(
            "sheet '{}' has {} columns, more than an xlsx sheet holds",
            sheet.name,
            sheet.headers.len().max(col + 1)
        )
    })
}

/// Cut text to `MAX_CELL_CHARS`, logging where it happened.
fn fit_cell_text<'a>(text: &'a str, sheet: &str, row: u32, col: usize) -> &'a str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            log::warn!(
                "sheet '{}' row {} column {}: text of {} characters truncated to {}",
                sheet,
                row,
                col,
                text.chars().count(),
                MAX_CELL_CHARS
            );
            &text[..end]
        }
        None => text,
    }
}

/// Excel serial number (1900 date system) for a timestamp.
fn to_serial(dt: &NaiveDateTime) -> Option<f64> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (*dt - epoch).num_seconds();
    Some(seconds as f64 / 86_400.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        let mut summary = Sheet::header_only("Summary", &["Field Comparison", "Total Rows"]);
        summary
            .rows
            .push(vec![CellValue::text("A vs A"), CellValue::Number(3.0)]);

        let mut differences = Sheet::header_only("Differences", &["Primary Key", "SourceValue_D", "TargetValue_D"]);
        let date = NaiveDate::from_ymd_opt(2024, 10, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        differences.rows.push(vec![
            CellValue::Number(7.0),
            CellValue::Date(date),
            CellValue::Empty,
        ]);

        let similarities = Sheet::header_only("Similarities", &["Primary Key", "Source Column", "Source Value", "Target Value"]);

        Report {
            sheets: vec![summary, differences, similarities],
        }
    }

    #[test]
    fn test_serial_of_known_date() {
        let dt = NaiveDate::from_ymd_opt(2024, 10, 11)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(to_serial(&dt), Some(45576.5));
    }

    #[test]
    fn test_export_report() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("report.xlsx");

        let result = export_report(&report(), &path).unwrap();
        assert_eq!(result.sheets_exported, 3);
        // Empty cells are skipped
        assert_eq!(result.cells_exported, 4);
        assert_eq!(result.width_fallbacks, 0);
        assert!(path.exists());
    }

    #[test]
    fn test_export_then_import() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("report.xlsx");
        export_report(&report(), &path).unwrap();

        let summary = import(&path, None).unwrap();
        assert_eq!(summary[0], vec![CellValue::text("Field Comparison"), CellValue::text("Total Rows")]);
        assert_eq!(summary[1], vec![CellValue::text("A vs A"), CellValue::Number(3.0)]);

        let similarities = import(&path, Some("Similarities")).unwrap();
        assert_eq!(similarities.len(), 1);
        assert_eq!(similarities[0].len(), 4);
    }

    #[test]
    fn test_export_truncates_overlong_text() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("report.xlsx");

        let mut differences = Sheet::header_only("Differences", &["Primary Key", "SourceValue_Content"]);
        differences
            .rows
            .push(vec![CellValue::Number(1.0), CellValue::text("x".repeat(40_000))]);
        let long = Report { sheets: vec![differences] };

        let result = export_report(&long, &path).unwrap();
        assert_eq!(result.cells_exported, 2);

        let grid = import(&path, None).unwrap();
        assert_eq!(grid[1][1], CellValue::text("x".repeat(MAX_CELL_CHARS)));
    }

    #[test]
    fn test_fit_cell_text_counts_characters() {
        let short = "é".repeat(10);
        assert_eq!(fit_cell_text(&short, "S", 1, 0), short);

        let long = "é".repeat(MAX_CELL_CHARS + 5);
        assert_eq!(fit_cell_text(&long, "S", 1, 0).chars().count(), MAX_CELL_CHARS);
    }

    #[test]
    fn test_column_index_overflow_is_an_error() {
        let sheet = Sheet::header_only("Wide", &["A"]);
        assert_eq!(column_index(&sheet, 3), Ok(3));
        let err = column_index(&sheet, 70_000).unwrap_err();
        assert!(err.contains("sheet 'Wide'"), "{err}");
    }

    #[test]
    fn test_import_missing_sheet() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("report.xlsx");
        export_report(&report(), &path).unwrap();

        let err = import(&path, Some("Nope")).unwrap_err();
        assert!(err.contains("sheet 'Nope' not found"), "{err}");
        assert!(err.contains("Summary, Differences, Similarities"), "{err}");
    }

    #[test]
    fn test_import_not_a_workbook() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("junk.xlsx");
        std::fs::write(&path, "not a zip").unwrap();
        assert!(import(&path, None).is_err());
    }
}
