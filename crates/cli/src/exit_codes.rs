//! CLI Exit Code Registry
//!
//! Single source of truth for `fieldcheck` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 2    | Usage error (bad arguments)                              |
//! | 3    | Input file not found                                     |
//! | 4    | Schema error (missing key or column, duplicate keys)     |
//! | 5    | No aligned rows                                          |
//! | 6    | Invalid config                                           |
//! | 7    | Read, write or normalization failure                     |
//!
//! A run that finds differences still exits 0; the report is the result.

use fieldcheck_compare::CompareError;

/// Success - report written (or config valid).
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, malformed `--map`.
pub const EXIT_USAGE: u8 = 2;

/// One or both input files (or the config file) do not exist.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Key column or mapped column missing, or duplicate keys.
pub const EXIT_SCHEMA: u8 = 4;

/// The two tables share no key, so percentages are undefined.
pub const EXIT_NO_ALIGNED_ROWS: u8 = 5;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// Reader or writer failure, or a value a date rule could not parse.
pub const EXIT_RUNTIME: u8 = 7;

/// Map a CompareError to its exit code.
pub fn compare_exit_code(err: &CompareError) -> u8 {
    match err {
        CompareError::NotFound(_) => EXIT_NOT_FOUND,
        CompareError::MissingKeyColumn { .. }
        | CompareError::MissingColumn { .. }
        | CompareError::DuplicateKeys(_) => EXIT_SCHEMA,
        CompareError::NoAlignedRows { .. } => EXIT_NO_ALIGNED_ROWS,
        CompareError::ConfigParse(_) | CompareError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        CompareError::DateParse { .. } | CompareError::Read { .. } | CompareError::Write { .. } => {
            EXIT_RUNTIME
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcheck_compare::Side;
    use std::path::PathBuf;

    #[test]
    fn schema_errors_share_a_code() {
        let missing_key = CompareError::MissingKeyColumn {
            side: Side::Source,
            column: "Id".into(),
        };
        let missing_col = CompareError::MissingColumn {
            source: "A".into(),
            target: "B".into(),
        };
        assert_eq!(compare_exit_code(&missing_key), EXIT_SCHEMA);
        assert_eq!(compare_exit_code(&missing_col), EXIT_SCHEMA);
        assert_eq!(compare_exit_code(&CompareError::DuplicateKeys(Vec::new())), EXIT_SCHEMA);
    }

    #[test]
    fn runtime_and_lookup_codes() {
        assert_eq!(
            compare_exit_code(&CompareError::NotFound(vec![PathBuf::from("a.xlsx")])),
            EXIT_NOT_FOUND
        );
        assert_eq!(
            compare_exit_code(&CompareError::Write {
                path: PathBuf::from("out.xlsx"),
                message: "disk full".into(),
            }),
            EXIT_RUNTIME
        );
        assert_eq!(
            compare_exit_code(&CompareError::ConfigParse("bad".into())),
            EXIT_INVALID_CONFIG
        );
    }
}
