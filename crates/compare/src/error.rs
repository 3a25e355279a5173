use std::fmt;
use std::path::PathBuf;

use crate::model::Side;

/// A key value that occurs more than once within one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub side: Side,
    pub key: String,
    pub count: usize,
}

#[derive(Debug)]
pub enum CompareError {
    /// One or both input files do not exist.
    NotFound(Vec<PathBuf>),
    /// Declared key column is absent from its table.
    MissingKeyColumn { side: Side, column: String },
    /// A mapped column pair is absent from its tables.
    MissingColumn { source: String, target: String },
    /// Key values repeated within a table (duplicate policy = error).
    DuplicateKeys(Vec<DuplicateKey>),
    /// No rows survived alignment, so percentages are undefined.
    NoAlignedRows { pair: String },
    /// A value could not be coerced by a date normalization rule.
    DateParse { side: Side, column: String, key: String, value: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty mapping, bad date format, etc.).
    ConfigValidation(String),
    /// Input file could not be loaded.
    Read { path: PathBuf, message: String },
    /// Report file could not be written.
    Write { path: PathBuf, message: String },
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(paths) => {
                let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "file not found: {}", names.join(", "))
            }
            Self::MissingKeyColumn { side, column } => {
                write!(f, "{side} table: primary key column '{column}' not found")
            }
            Self::MissingColumn { source, target } => {
                write!(f, "column '{source}' or '{target}' not found in the respective tables")
            }
            Self::DuplicateKeys(dups) => {
                writeln!(f, "duplicate primary keys found:")?;
                for dup in dups {
                    writeln!(f, "  {} key {:?} appears {} times", dup.side, dup.key, dup.count)?;
                }
                Ok(())
            }
            Self::NoAlignedRows { pair } => {
                write!(f, "'{pair}': no rows share a primary key, percentages are undefined")
            }
            Self::DateParse { side, column, key, value } => {
                write!(f, "{side} column '{column}', key '{key}': cannot parse date '{value}'")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
        }
    }
}

impl std::error::Error for CompareError {}
