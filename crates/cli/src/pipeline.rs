// End-to-end run: resolve inputs, load both tables, compare, write the report.

use std::path::{Path, PathBuf};

use serde::Serialize;

use fieldcheck_compare::config::ColumnPair;
use fieldcheck_compare::{CompareConfig, CompareError, ComparisonResult, Table};

/// What a finished run reports back: where the workbook went plus the
/// per-pair statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub output: PathBuf,
    #[serde(flatten)]
    pub result: ComparisonResult,
}

/// Read and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<CompareConfig, CompareError> {
    if !path.is_file() {
        return Err(CompareError::NotFound(vec![path.to_path_buf()]));
    }
    let text = std::fs::read_to_string(path).map_err(|e| CompareError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    CompareConfig::from_toml(&text)
}

/// Directory that relative input paths in `config_path` resolve against.
pub fn config_base_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Run one comparison. Input files resolve against `base_dir`; the output
/// path is used as given.
///
/// Nothing is written unless every stage before the write succeeds.
pub fn run_comparison(config: &CompareConfig, base_dir: &Path) -> Result<RunOutcome, CompareError> {
    let (source, target) = load_inputs(config, base_dir)?;
    compare_and_write(config, &source, &target)
}

/// Load both tables. Missing files are reported together before anything is read.
pub fn load_inputs(config: &CompareConfig, base_dir: &Path) -> Result<(Table, Table), CompareError> {
    let source_path = base_dir.join(&config.source.file);
    let target_path = base_dir.join(&config.target.file);

    let missing: Vec<PathBuf> = [&source_path, &target_path]
        .into_iter()
        .filter(|p| !p.is_file())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(CompareError::NotFound(missing));
    }

    let source = load(&source_path, config.source.sheet.as_deref())?;
    let target = load(&target_path, config.target.sheet.as_deref())?;
    Ok((source, target))
}

/// Compare loaded tables and write the report to `config.output`.
pub fn compare_and_write(
    config: &CompareConfig,
    source: &Table,
    target: &Table,
) -> Result<RunOutcome, CompareError> {
    let result = fieldcheck_compare::run(config, source, target)?;

    let exported = fieldcheck_io::export_report(&result.report, &config.output).map_err(|message| {
        CompareError::Write {
            path: config.output.clone(),
            message,
        }
    })?;
    log::info!("{}: {}", config.output.display(), exported.summary());

    Ok(RunOutcome {
        output: config.output.clone(),
        result,
    })
}

/// Map every source column (key excluded) that the target also has to
/// itself, in source header order.
pub fn same_name_pairs(source: &Table, source_key: &str, target: &Table) -> Vec<ColumnPair> {
    source
        .headers
        .iter()
        .filter(|h| h.as_str() != source_key)
        .filter(|h| target.column_index(h).is_some())
        .map(|h| ColumnPair::new(h.as_str(), h.as_str()))
        .collect()
}

fn load(path: &Path, sheet: Option<&str>) -> Result<Table, CompareError> {
    fieldcheck_io::load_table(path, sheet).map_err(|message| CompareError::Read {
        path: path.to_path_buf(),
        message,
    })
}
