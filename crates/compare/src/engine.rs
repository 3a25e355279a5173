use crate::aggregate::summarize_pair;
use crate::align::{align, Alignment};
use crate::classify::{classify_per_field, classify_per_row, PairColumn};
use crate::config::{ClassificationMode, ColumnPair, CompareConfig};
use crate::error::CompareError;
use crate::model::{CellValue, CompareMeta, ComparisonResult, RunStats, Side, Table};
use crate::normalize::{apply_rules, UnparsedDate};
use crate::pivot::{per_row_headers, pivot_field_records, row_records_sheet};
use crate::report::{summary_sheet, Report, DIFFERENCES_SHEET, SIMILARITIES_SHEET};

/// Compare two loaded tables per config. Returns per-column stats plus the
/// shaped report; nothing is written here.
pub fn run(config: &CompareConfig, source: &Table, target: &Table) -> Result<ComparisonResult, CompareError> {
    let source_key = key_index(source, &config.source.key, Side::Source)?;
    let target_key = key_index(target, &config.target.key, Side::Target)?;

    let alignment = align(source, source_key, target, target_key, config.on_duplicate_key)?;

    let fallout = match config.mode {
        ClassificationMode::PerField => Some(alignment.fallout()),
        ClassificationMode::PerRow => None,
    };

    // Columns resolve lazily: the first missing pair aborts the run
    let mut columns = Vec::with_capacity(config.columns.len());
    let mut summaries = Vec::with_capacity(config.columns.len());
    for pair in &config.columns {
        let column = resolve_pair(pair, source, target, &alignment)?;
        summaries.push(summarize_pair(
            pair,
            &column.source_values,
            &column.target_values,
            fallout,
        )?);
        columns.push(column);
    }

    let mut stats = RunStats {
        source_rows: alignment.source_rows,
        target_rows: alignment.target_rows,
        aligned_rows: alignment.len(),
        fallout: alignment.fallout(),
        ..RunStats::default()
    };

    let (differences, similarities) = match config.mode {
        ClassificationMode::PerField => {
            let classified = classify_per_field(&alignment, &columns);
            stats.difference_keys = classified.difference_keys();
            stats.similarity_keys = classified.similarity_keys();
            (
                pivot_field_records(DIFFERENCES_SHEET, &classified.differences),
                pivot_field_records(SIMILARITIES_SHEET, &classified.similarities),
            )
        }
        ClassificationMode::PerRow => {
            let classified =
                classify_per_row(source, source_key, target, target_key, &alignment, &columns);
            stats.difference_keys = classified.differences.len();
            stats.similarity_keys = classified.similarities.len();
            let (diff_headers, sim_headers) = per_row_headers(source, source_key, target, target_key);
            (
                row_records_sheet(DIFFERENCES_SHEET, diff_headers, &classified.differences),
                row_records_sheet(SIMILARITIES_SHEET, sim_headers, &classified.similarities),
            )
        }
    };

    log::info!(
        "{}: {} pair(s) compared, {} key(s) differ, {} key(s) match",
        config.name,
        summaries.len(),
        stats.difference_keys,
        stats.similarity_keys
    );

    Ok(ComparisonResult {
        meta: CompareMeta {
            config_name: config.name.clone(),
            mode: config.mode,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        stats,
        report: Report {
            sheets: vec![summary_sheet(&summaries, config.mode), differences, similarities],
        },
        columns: summaries,
    })
}

fn key_index(table: &Table, column: &str, side: Side) -> Result<usize, CompareError> {
    table
        .column_index(column)
        .ok_or_else(|| CompareError::MissingKeyColumn {
            side,
            column: column.to_string(),
        })
}

fn resolve_pair<'a>(
    pair: &'a ColumnPair,
    source: &Table,
    target: &Table,
    alignment: &Alignment,
) -> Result<PairColumn<'a>, CompareError> {
    let (Some(source_col), Some(target_col)) =
        (source.column_index(&pair.source), target.column_index(&pair.target))
    else {
        return Err(CompareError::MissingColumn {
            source: pair.source.clone(),
            target: pair.target.clone(),
        });
    };

    let source_values = column_values(pair, Side::Source, source, source_col, alignment)?;
    let target_values = column_values(pair, Side::Target, target, target_col, alignment)?;

    Ok(PairColumn {
        pair,
        source_col,
        target_col,
        source_values,
        target_values,
    })
}

/// Aligned, normalized values of one column.
fn column_values(
    pair: &ColumnPair,
    side: Side,
    table: &Table,
    col: usize,
    alignment: &Alignment,
) -> Result<Vec<CellValue>, CompareError> {
    let column = match side {
        Side::Source => &pair.source,
        Side::Target => &pair.target,
    };

    alignment
        .rows
        .iter()
        .map(|row| {
            let table_row = match side {
                Side::Source => row.source_row,
                Side::Target => row.target_row,
            };
            let raw = table.cell(table_row, col).clone();
            apply_rules(&pair.normalize, side, raw).map_err(|UnparsedDate(value)| {
                CompareError::DateParse {
                    side,
                    column: column.clone(),
                    key: row.key.clone(),
                    value,
                }
            })
        })
        .collect()
}
