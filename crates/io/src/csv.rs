// CSV/TSV import

use std::io::Read;
use std::path::Path;

use fieldcheck_compare::CellValue;

/// Read a delimited file into a grid of typed cells, header row included.
///
/// `.tsv` files are always tab-separated; anything else has its delimiter
/// sniffed from the first lines.
pub fn import(path: &Path) -> Result<Vec<Vec<CellValue>>, String> {
    let content = read_file_as_utf8(path)?;
    let is_tsv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
    let delimiter = if is_tsv { b'\t' } else { sniff_delimiter(&content) };
    import_from_string(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // More columns break ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Windows-1252 fallback for Excel exports)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Vec<Vec<CellValue>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("line {}: {}", row_idx + 1, e))?;
        grid.push(record.iter().map(parse_cell).collect());
    }
    Ok(grid)
}

/// Type one CSV field the way a spreadsheet would on open.
pub fn parse_cell(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Bool(false);
    }
    if !is_exact_number(trimmed) {
        return CellValue::Text(field.to_string());
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_nan() => CellValue::Empty,
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(field.to_string()),
    }
}

/// Most significant digits an `f64` holds for every decimal input.
const MAX_EXACT_DIGITS: usize = 15;

/// False for digit strings a float would not carry back out unchanged:
/// zero-padded codes (`007`) and more than 15 significant digits.
fn is_exact_number(s: &str) -> bool {
    let unsigned = s.trim_start_matches(['+', '-']);
    let mantissa = unsigned.split(['e', 'E']).next().unwrap_or(unsigned);
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    if int_part.len() > 1 && int_part.starts_with('0') {
        return false;
    }

    let digits: String = int_part.chars().chain(frac_part.chars()).collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        // Not a plain decimal; let the float parser decide
        return true;
    }
    let significant = digits.trim_start_matches('0').trim_end_matches('0');
    significant.len() <= MAX_EXACT_DIGITS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Name,Age,City\nAlice,30,Paris\nBob,25,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_parse_cell_types() {
        assert_eq!(parse_cell(""), CellValue::Empty);
        assert_eq!(parse_cell("  "), CellValue::Empty);
        assert_eq!(parse_cell("TRUE"), CellValue::Bool(true));
        assert_eq!(parse_cell("false"), CellValue::Bool(false));
        assert_eq!(parse_cell("42"), CellValue::Number(42.0));
        assert_eq!(parse_cell("-1.5"), CellValue::Number(-1.5));
        assert_eq!(parse_cell("NaN"), CellValue::Empty);
        assert_eq!(parse_cell("inf"), CellValue::text("inf"));
        assert_eq!(parse_cell("0012-AB"), CellValue::text("0012-AB"));
        assert_eq!(parse_cell("0.25"), CellValue::Number(0.25));
        assert_eq!(parse_cell("1e3"), CellValue::Number(1000.0));
    }

    #[test]
    fn test_parse_cell_keeps_long_digit_strings_as_text() {
        assert_eq!(parse_cell("12345678901234567"), CellValue::text("12345678901234567"));
        assert_eq!(parse_cell("12345678901234568"), CellValue::text("12345678901234568"));
        assert_eq!(parse_cell("-1234567890.123456"), CellValue::text("-1234567890.123456"));
        // 15 significant digits still fit
        assert_eq!(parse_cell("123456789012345"), CellValue::Number(123456789012345.0));
        assert_eq!(parse_cell("1000000000000000000"), CellValue::Number(1e18));
    }

    #[test]
    fn test_parse_cell_keeps_zero_padded_codes_as_text() {
        assert_eq!(parse_cell("007"), CellValue::text("007"));
        assert_eq!(parse_cell("-007"), CellValue::text("-007"));
        assert_eq!(parse_cell("0044123456789"), CellValue::text("0044123456789"));
        assert_eq!(parse_cell("0"), CellValue::Number(0.0));
    }

    #[test]
    fn test_semicolon_csv_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "Name;Age;City\nAlice;30;Paris\nBob;;London\n").unwrap();

        let grid = import(&path).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0][0], CellValue::text("Name"));
        assert_eq!(grid[1][1], CellValue::Number(30.0));
        assert_eq!(grid[2][1], CellValue::Empty);
        assert_eq!(grid[2][2], CellValue::text("London"));
    }

    #[test]
    fn test_tsv_is_tab_separated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.tsv");
        // Commas inside values must not be taken as the delimiter
        fs::write(&path, "Id\tNote\n1\ta,b,c\n").unwrap();

        let grid = import(&path).unwrap();
        assert_eq!(grid[1], vec![CellValue::Number(1.0), CellValue::text("a,b,c")]);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Café" with 0xE9 for é
        fs::write(&path, b"Id,Name\n1,Caf\xe9\n").unwrap();

        let grid = import(&path).unwrap();
        assert_eq!(grid[1][1], CellValue::text("Café"));
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Id,Name\n1,x\n").unwrap();

        let grid = import(&path).unwrap();
        assert_eq!(grid[0][0], CellValue::text("Id"));
    }
}
