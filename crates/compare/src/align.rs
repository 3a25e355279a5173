use std::collections::HashMap;

use crate::config::DuplicateKeyPolicy;
use crate::error::{CompareError, DuplicateKey};
use crate::model::{CellValue, Side, Table};

/// A key present in both tables, with the row each side contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub key: String,
    pub key_value: CellValue,
    pub source_row: usize,
    pub target_row: usize,
}

/// Inner join of source and target on their key columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub rows: Vec<AlignedRow>,
    pub source_rows: usize,
    pub target_rows: usize,
}

impl Alignment {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row-count gap between the original tables, independent of alignment.
    pub fn fallout(&self) -> usize {
        self.source_rows.abs_diff(self.target_rows)
    }
}

/// Join `source` and `target` on their key columns.
///
/// Keys compare by their rendered text, so a numeric `1` in one export joins
/// a textual `"1"` in the other. Rows with an empty key never align. The
/// result follows the source table's row order.
pub fn align(
    source: &Table,
    source_key: usize,
    target: &Table,
    target_key: usize,
    policy: DuplicateKeyPolicy,
) -> Result<Alignment, CompareError> {
    let mut duplicates = Vec::new();
    let source_index = index_keys(source, source_key, Side::Source, &mut duplicates);
    let target_index = index_keys(target, target_key, Side::Target, &mut duplicates);

    if !duplicates.is_empty() {
        duplicates.sort_by(|a, b| (a.side, &a.key).cmp(&(b.side, &b.key)));
        match policy {
            DuplicateKeyPolicy::Error => return Err(CompareError::DuplicateKeys(duplicates)),
            DuplicateKeyPolicy::KeepLast => {
                for dup in &duplicates {
                    log::warn!(
                        "{} key {:?} appears {} times, keeping the last row",
                        dup.side,
                        dup.key,
                        dup.count
                    );
                }
            }
        }
    }

    let mut rows = Vec::new();
    for (i, row) in source.rows.iter().enumerate() {
        let key_value = &row[source_key];
        if key_value.is_empty() {
            continue;
        }
        let key = key_value.to_string();
        // Only the surviving occurrence of a repeated key takes part
        if source_index.get(&key) != Some(&i) {
            continue;
        }
        if let Some(&target_row) = target_index.get(&key) {
            rows.push(AlignedRow {
                key,
                key_value: key_value.clone(),
                source_row: i,
                target_row,
            });
        }
    }

    log::info!(
        "aligned {} of {} source rows and {} target rows",
        rows.len(),
        source.len(),
        target.len()
    );

    Ok(Alignment {
        rows,
        source_rows: source.len(),
        target_rows: target.len(),
    })
}

/// Map each key to the last row carrying it, recording repeats.
fn index_keys(
    table: &Table,
    key_col: usize,
    side: Side,
    duplicates: &mut Vec<DuplicateKey>,
) -> HashMap<String, usize> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut empty_keys = 0;

    for (i, row) in table.rows.iter().enumerate() {
        let key_value = &row[key_col];
        if key_value.is_empty() {
            empty_keys += 1;
            continue;
        }
        let key = key_value.to_string();
        *counts.entry(key.clone()).or_insert(0) += 1;
        index.insert(key, i);
    }

    if empty_keys > 0 {
        log::warn!("{side} table: skipped {empty_keys} row(s) with an empty key");
    }

    for (key, count) in counts {
        if count > 1 {
            duplicates.push(DuplicateKey { side, key, count });
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(keys: &[&str]) -> Table {
        let mut t = Table::new(vec!["K".into(), "A".into()]);
        for (i, k) in keys.iter().enumerate() {
            let key = if k.is_empty() { CellValue::Empty } else { CellValue::text(*k) };
            t.push_row(vec![key, CellValue::Number(i as f64)]);
        }
        t
    }

    fn keys(a: &Alignment) -> Vec<&str> {
        a.rows.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn inner_join_in_source_order() {
        let source = table(&["3", "1", "2"]);
        let target = table(&["2", "3", "4"]);
        let a = align(&source, 0, &target, 0, DuplicateKeyPolicy::Error).unwrap();
        assert_eq!(keys(&a), vec!["3", "2"]);
        assert_eq!(a.rows[0].source_row, 0);
        assert_eq!(a.rows[0].target_row, 1);
        assert_eq!(a.rows[1].target_row, 0);
    }

    #[test]
    fn fallout_uses_raw_sizes() {
        let source = table(&["1", "2"]);
        let target = table(&["2", "3", "4", "5"]);
        let a = align(&source, 0, &target, 0, DuplicateKeyPolicy::Error).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a.fallout(), 2);
    }

    #[test]
    fn numeric_and_text_keys_join() {
        let mut source = Table::new(vec!["K".into()]);
        source.push_row(vec![CellValue::Number(7.0)]);
        let mut target = Table::new(vec!["K".into()]);
        target.push_row(vec![CellValue::text("7")]);
        let a = align(&source, 0, &target, 0, DuplicateKeyPolicy::Error).unwrap();
        assert_eq!(keys(&a), vec!["7"]);
        assert_eq!(a.rows[0].key_value, CellValue::Number(7.0));
    }

    #[test]
    fn empty_keys_never_align() {
        let source = table(&["", "1"]);
        let target = table(&["", "1"]);
        let a = align(&source, 0, &target, 0, DuplicateKeyPolicy::Error).unwrap();
        assert_eq!(keys(&a), vec!["1"]);
        assert_eq!(a.source_rows, 2);
    }

    #[test]
    fn duplicates_rejected_by_default() {
        let source = table(&["1", "1", "2"]);
        let target = table(&["2", "2", "2"]);
        let err = align(&source, 0, &target, 0, DuplicateKeyPolicy::Error).unwrap_err();
        match err {
            CompareError::DuplicateKeys(dups) => {
                assert_eq!(
                    dups,
                    vec![
                        DuplicateKey { side: Side::Source, key: "1".into(), count: 2 },
                        DuplicateKey { side: Side::Target, key: "2".into(), count: 3 },
                    ]
                );
            }
            other => panic!("expected DuplicateKeys, got {other:?}"),
        }
    }

    #[test]
    fn keep_last_uses_last_occurrence() {
        let source = table(&["1", "2", "1"]);
        let target = table(&["1", "1"]);
        let a = align(&source, 0, &target, 0, DuplicateKeyPolicy::KeepLast).unwrap();
        assert_eq!(keys(&a), vec!["1"]);
        assert_eq!(a.rows[0].source_row, 2);
        assert_eq!(a.rows[0].target_row, 1);
    }
}
