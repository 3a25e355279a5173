// Load a file into a headed table

use std::collections::HashSet;
use std::path::Path;

use fieldcheck_compare::{CellValue, Table};

/// Extensions read through the CSV reader. Everything else goes to calamine.
const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// Load the first row as headers and the rest as data rows.
///
/// `sheet` selects a worksheet in spreadsheet files and is ignored for
/// delimited text.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<Table, String> {
    let grid = if is_delimited(path) {
        if sheet.is_some() {
            log::warn!("{}: sheet is ignored for delimited files", path.display());
        }
        crate::csv::import(path)?
    } else {
        crate::xlsx::import(path, sheet)?
    };

    let table = from_grid(grid);
    log::info!(
        "{}: loaded {} row(s) x {} column(s)",
        path.display(),
        table.len(),
        table.headers.len()
    );
    Ok(table)
}

fn is_delimited(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DELIMITED_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
}

/// Build a table from a raw grid. Rows whose cells are all empty are dropped.
pub fn from_grid(grid: Vec<Vec<CellValue>>) -> Table {
    let mut rows = grid.into_iter();
    let header_row = rows.next().unwrap_or_default();
    let mut table = Table::new(header_names(&header_row));

    for row in rows {
        if row.iter().all(CellValue::is_empty) {
            continue;
        }
        table.push_row(row);
    }
    table
}

/// Render header cells to unique names: blanks become `Unnamed: <index>`,
/// repeats get `.1`, `.2`, ... suffixes.
pub fn header_names(cells: &[CellValue]) -> Vec<String> {
    let raw: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.to_string();
            if name.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());
    for name in raw {
        let mut unique = name.clone();
        let mut n = 1;
        while taken.contains(&unique) {
            unique = format!("{}.{}", name, n);
            n += 1;
        }
        taken.insert(unique.clone());
        names.push(unique);
    }
    names
}
