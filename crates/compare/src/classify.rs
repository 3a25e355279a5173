use std::collections::{HashMap, HashSet};

use crate::align::Alignment;
use crate::config::ColumnPair;
use crate::model::{CellValue, FieldRecord, RowRecord, Side, Table};

/// Normalized values of one mapped pair, one entry per aligned row.
#[derive(Debug, Clone)]
pub struct PairColumn<'a> {
    pub pair: &'a ColumnPair,
    pub source_col: usize,
    pub target_col: usize,
    pub source_values: Vec<CellValue>,
    pub target_values: Vec<CellValue>,
}

impl PairColumn<'_> {
    pub fn value(&self, side: Side, position: usize) -> &CellValue {
        match side {
            Side::Source => &self.source_values[position],
            Side::Target => &self.target_values[position],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified<T> {
    pub differences: Vec<T>,
    pub similarities: Vec<T>,
}

impl Classified<FieldRecord> {
    pub fn difference_keys(&self) -> usize {
        distinct_positions(&self.differences)
    }

    pub fn similarity_keys(&self) -> usize {
        distinct_positions(&self.similarities)
    }
}

fn distinct_positions(records: &[FieldRecord]) -> usize {
    records.iter().map(|r| r.position).collect::<HashSet<_>>().len()
}

/// Classify every (aligned row, mapped pair) independently.
///
/// A key with at least one differing column is dropped from the similarities
/// entirely, so similarities only hold fully matching keys.
pub fn classify_per_field(alignment: &Alignment, columns: &[PairColumn]) -> Classified<FieldRecord> {
    let mut differences = Vec::new();
    let mut similarities = Vec::new();

    for (c, column) in columns.iter().enumerate() {
        for (position, row) in alignment.rows.iter().enumerate() {
            let source_value = &column.source_values[position];
            let target_value = &column.target_values[position];
            let record = FieldRecord {
                position,
                column: c,
                key: row.key_value.clone(),
                source_column: column.pair.source.clone(),
                source_value: source_value.clone(),
                target_value: target_value.clone(),
            };
            if source_value.matches(target_value) {
                similarities.push(record);
            } else {
                differences.push(record);
            }
        }
    }

    let differing: HashSet<usize> = differences.iter().map(|r| r.position).collect();
    similarities.retain(|r| !differing.contains(&r.position));

    Classified {
        differences,
        similarities,
    }
}

/// Classify each aligned row once across all mapped pairs.
///
/// Similarity records carry the full source row (non-key columns). Difference
/// records carry the full source row followed by the full target row. Mapped
/// columns show their normalized values.
pub fn classify_per_row(
    source: &Table,
    source_key: usize,
    target: &Table,
    target_key: usize,
    alignment: &Alignment,
    columns: &[PairColumn],
) -> Classified<RowRecord> {
    let source_overlay: HashMap<usize, usize> = columns
        .iter()
        .enumerate()
        .map(|(c, col)| (col.source_col, c))
        .collect();
    let mut target_overlay: HashMap<usize, usize> = HashMap::new();
    for (c, col) in columns.iter().enumerate() {
        target_overlay.entry(col.target_col).or_insert(c);
    }

    let mut differences = Vec::new();
    let mut similarities = Vec::new();

    for (position, row) in alignment.rows.iter().enumerate() {
        let all_match = columns
            .iter()
            .all(|col| col.source_values[position].matches(&col.target_values[position]));

        let mut cells = full_row(source, row.source_row, source_key, position, &source_overlay, columns, Side::Source);

        if all_match {
            similarities.push(RowRecord {
                key: row.key_value.clone(),
                cells,
            });
        } else {
            cells.extend(full_row(target, row.target_row, target_key, position, &target_overlay, columns, Side::Target));
            differences.push(RowRecord {
                key: row.key_value.clone(),
                cells,
            });
        }
    }

    Classified {
        differences,
        similarities,
    }
}

/// Non-key cells of one row, with mapped columns replaced by their
/// normalized values.
fn full_row(
    table: &Table,
    row: usize,
    key_col: usize,
    position: usize,
    overlay: &HashMap<usize, usize>,
    columns: &[PairColumn],
    side: Side,
) -> Vec<CellValue> {
    (0..table.headers.len())
        .filter(|&col| col != key_col)
        .map(|col| match overlay.get(&col) {
            Some(&c) => columns[c].value(side, position).clone(),
            None => table.cell(row, col).clone(),
        })
        .collect()
}
