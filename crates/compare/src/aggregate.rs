use crate::config::ColumnPair;
use crate::error::CompareError;
use crate::model::{CellValue, ColumnSummary};

/// Count matching rows for one mapped pair over the aligned set.
///
/// `source` and `target` hold the (normalized) values of the pair, one per
/// aligned row. An empty aligned set leaves the percentages undefined and is
/// reported as `NoAlignedRows`.
pub fn summarize_pair(
    pair: &ColumnPair,
    source: &[CellValue],
    target: &[CellValue],
    fallout: Option<usize>,
) -> Result<ColumnSummary, CompareError> {
    debug_assert_eq!(source.len(), target.len());

    let total_rows = source.len();
    if total_rows == 0 {
        return Err(CompareError::NoAlignedRows { pair: pair.label() });
    }

    let correct_rows = source
        .iter()
        .zip(target)
        .filter(|(s, t)| s.matches(t))
        .count();
    let incorrect_rows = total_rows - correct_rows;

    Ok(ColumnSummary {
        field: pair.label(),
        source_column: pair.source.clone(),
        target_column: pair.target.clone(),
        total_rows,
        correct_rows,
        incorrect_rows,
        percentage_correct: percentage(correct_rows, total_rows),
        percentage_incorrect: percentage(incorrect_rows, total_rows),
        fallout,
    })
}

fn percentage(count: usize, total: usize) -> f64 {
    count as f64 / total as f64 * 100.0
}
