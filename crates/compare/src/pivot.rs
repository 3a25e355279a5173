// Reshape classified records into report sheets.

use std::collections::BTreeMap;

use crate::model::{CellValue, FieldRecord, RowRecord, Table};
use crate::report::Sheet;

pub const PRIMARY_KEY: &str = "Primary Key";
pub const SOURCE_VALUE_PREFIX: &str = "SourceValue_";
pub const TARGET_VALUE_PREFIX: &str = "TargetValue_";
pub const TARGET_COLUMN_PREFIX: &str = "Target_";

/// Columns of the sheet written when per-field mode has no records.
pub const FIELD_PLACEHOLDER_HEADERS: [&str; 4] =
    [PRIMARY_KEY, "Source Column", "Source Value", "Target Value"];

/// Pivot per-field records into one row per key.
///
/// Columns are `Primary Key`, then `SourceValue_<col>` for every mapped
/// column present in `records` (mapping order), then the matching
/// `TargetValue_<col>` columns. Rows follow aligned order; a key with no
/// record for some column leaves that cell empty.
pub fn pivot_field_records(name: &str, records: &[FieldRecord]) -> Sheet {
    if records.is_empty() {
        return Sheet::header_only(name, &FIELD_PLACEHOLDER_HEADERS);
    }

    let mut present: BTreeMap<usize, &str> = BTreeMap::new();
    for r in records {
        present.entry(r.column).or_insert(r.source_column.as_str());
    }
    let slots: BTreeMap<usize, usize> = present
        .keys()
        .enumerate()
        .map(|(slot, &column)| (column, slot))
        .collect();
    let width = present.len();

    let mut headers = Vec::with_capacity(1 + 2 * width);
    headers.push(PRIMARY_KEY.to_string());
    headers.extend(present.values().map(|c| format!("{SOURCE_VALUE_PREFIX}{c}")));
    headers.extend(present.values().map(|c| format!("{TARGET_VALUE_PREFIX}{c}")));

    let mut rows: BTreeMap<usize, Vec<CellValue>> = BTreeMap::new();
    for r in records {
        let row = rows.entry(r.position).or_insert_with(|| {
            let mut cells = vec![CellValue::Empty; 1 + 2 * width];
            cells[0] = r.key.clone();
            cells
        });
        let slot = slots[&r.column];
        row[1 + slot] = r.source_value.clone();
        row[1 + width + slot] = r.target_value.clone();
    }

    let mut sheet = Sheet::new(name, headers);
    sheet.rows = rows.into_values().collect();
    sheet
}

/// Write per-row records as they are, under `headers`.
pub fn row_records_sheet(name: &str, headers: Vec<String>, records: &[RowRecord]) -> Sheet {
    let mut sheet = Sheet::new(name, headers);
    sheet.rows = records
        .iter()
        .map(|r| {
            let mut row = Vec::with_capacity(1 + r.cells.len());
            row.push(r.key.clone());
            row.extend(r.cells.iter().cloned());
            row
        })
        .collect();
    sheet
}

/// Headers of the per-row sheets: (differences, similarities).
///
/// Similarities list the source's non-key columns; differences add the
/// target's non-key columns, prefixed `Target_`.
pub fn per_row_headers(
    source: &Table,
    source_key: usize,
    target: &Table,
    target_key: usize,
) -> (Vec<String>, Vec<String>) {
    let mut similarities = vec![PRIMARY_KEY.to_string()];
    similarities.extend(non_key_headers(source, source_key).map(str::to_string));

    let mut differences = similarities.clone();
    differences.extend(
        non_key_headers(target, target_key).map(|h| format!("{TARGET_COLUMN_PREFIX}{h}")),
    );

    (differences, similarities)
}

fn non_key_headers(table: &Table, key_col: usize) -> impl Iterator<Item = &str> {
    table
        .headers
        .iter()
        .enumerate()
        .filter(move |(i, _)| *i != key_col)
        .map(|(_, h)| h.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(position: usize, column: usize, name: &str, s: &str, t: &str) -> FieldRecord {
        FieldRecord {
            position,
            column,
            key: CellValue::Number(position as f64 + 100.0),
            source_column: name.into(),
            source_value: CellValue::text(s),
            target_value: CellValue::text(t),
        }
    }

    #[test]
    fn pivot_orders_columns_by_mapping_and_rows_by_position() {
        // Collected column-major, as classification produces them
        let records = vec![
            record(2, 0, "Name", "a", "A"),
            record(1, 3, "Stage", "won", "lost"),
            record(2, 3, "Stage", "open", "closed"),
        ];
        let sheet = pivot_field_records("Differences", &records);

        assert_eq!(
            sheet.headers,
            vec![
                "Primary Key",
                "SourceValue_Name",
                "SourceValue_Stage",
                "TargetValue_Name",
                "TargetValue_Stage",
            ]
        );
        assert_eq!(
            sheet.rows,
            vec![
                vec![
                    CellValue::Number(101.0),
                    CellValue::Empty,
                    CellValue::text("won"),
                    CellValue::Empty,
                    CellValue::text("lost"),
                ],
                vec![
                    CellValue::Number(102.0),
                    CellValue::text("a"),
                    CellValue::text("open"),
                    CellValue::text("A"),
                    CellValue::text("closed"),
                ],
            ]
        );
    }

    #[test]
    fn empty_records_give_placeholder() {
        let sheet = pivot_field_records("Similarities", &[]);
        assert_eq!(sheet.name, "Similarities");
        assert_eq!(sheet.headers, FIELD_PLACEHOLDER_HEADERS.to_vec());
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn per_row_headers_skip_keys() {
        let source = Table::new(vec!["Id".into(), "Name".into(), "Amount".into()]);
        let target = Table::new(vec!["Name".into(), "ExtId".into()]);
        let (diff, sim) = per_row_headers(&source, 0, &target, 1);
        assert_eq!(sim, vec!["Primary Key", "Name", "Amount"]);
        assert_eq!(diff, vec!["Primary Key", "Name", "Amount", "Target_Name"]);
    }

    #[test]
    fn row_records_prepend_key() {
        let records = vec![RowRecord {
            key: CellValue::text("k1"),
            cells: vec![CellValue::text("v")],
        }];
        let sheet = row_records_sheet("Similarities", vec!["Primary Key".into(), "A".into()], &records);
        assert_eq!(sheet.rows, vec![vec![CellValue::text("k1"), CellValue::text("v")]]);
    }
}
