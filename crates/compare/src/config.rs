use std::collections::HashSet;
use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::CompareError;
use crate::normalize::{NormalizeOp, NormalizeRule};

pub const DEFAULT_OUTPUT: &str = "comparison_report.xlsx";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CompareConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub mode: ClassificationMode,
    /// Report path. Relative paths resolve against the working directory.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub on_duplicate_key: DuplicateKeyPolicy,
    pub source: TableConfig,
    pub target: TableConfig,
    pub columns: Vec<ColumnPair>,
}

fn default_name() -> String {
    "comparison".into()
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

// ---------------------------------------------------------------------------
// Tables + columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// Input file. Relative paths resolve against the config file's directory.
    pub file: PathBuf,
    /// Primary key column.
    pub key: String,
    /// Worksheet to read. Defaults to the first sheet.
    #[serde(default)]
    pub sheet: Option<String>,
}

impl TableConfig {
    pub fn new(file: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            key: key.into(),
            sheet: None,
        }
    }
}

/// One source-column → target-column mapping entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnPair {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub normalize: Vec<NormalizeRule>,
}

impl ColumnPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            normalize: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: NormalizeRule) -> Self {
        self.normalize.push(rule);
        self
    }

    /// Label used in the summary sheet, e.g. `Amount vs Amount__c`.
    pub fn label(&self) -> String {
        format!("{} vs {}", self.source, self.target)
    }
}

// ---------------------------------------------------------------------------
// Modes + policies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Each mapped column of each aligned row is classified on its own.
    #[default]
    PerField,
    /// Each aligned row is classified once across all mapped columns.
    PerRow,
}

impl std::fmt::Display for ClassificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerField => write!(f, "per_field"),
            Self::PerRow => write!(f, "per_row"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Fail the run when a key repeats within a table.
    #[default]
    Error,
    /// The last row carrying a key wins.
    KeepLast,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CompareConfig {
    pub fn new(source: TableConfig, target: TableConfig, columns: Vec<ColumnPair>) -> Self {
        Self {
            name: default_name(),
            mode: ClassificationMode::default(),
            output: default_output(),
            on_duplicate_key: DuplicateKeyPolicy::default(),
            source,
            target,
            columns,
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, CompareError> {
        let config: CompareConfig =
            toml::from_str(input).map_err(|e| CompareError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        for (side, table) in [("source", &self.source), ("target", &self.target)] {
            if table.key.trim().is_empty() {
                return Err(CompareError::ConfigValidation(format!(
                    "{side}: key column name is empty"
                )));
            }
            if table.file.as_os_str().is_empty() {
                return Err(CompareError::ConfigValidation(format!("{side}: file is empty")));
            }
        }

        if self.columns.is_empty() {
            return Err(CompareError::ConfigValidation(
                "at least one column mapping is required".into(),
            ));
        }

        // Mapping keys are source columns, so each may appear once
        let mut seen = HashSet::new();
        for pair in &self.columns {
            if pair.source.is_empty() || pair.target.is_empty() {
                return Err(CompareError::ConfigValidation(format!(
                    "column mapping '{}' has an empty column name",
                    pair.label()
                )));
            }
            if !seen.insert(pair.source.as_str()) {
                return Err(CompareError::ConfigValidation(format!(
                    "source column '{}' is mapped more than once",
                    pair.source
                )));
            }
            for rule in &pair.normalize {
                if let NormalizeOp::Date { format } = &rule.op {
                    validate_date_format(&pair.source, format)?;
                }
            }
        }

        Ok(())
    }
}

fn validate_date_format(column: &str, format: &str) -> Result<(), CompareError> {
    if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(CompareError::ConfigValidation(format!(
            "column '{column}': invalid date format '{format}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
