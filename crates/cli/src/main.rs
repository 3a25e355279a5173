// fieldcheck CLI - keyed two-table field comparison

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;

use fieldcheck_cli::pipeline::{self, RunOutcome};
use fieldcheck_compare::config::{
    ClassificationMode, ColumnPair, CompareConfig, DuplicateKeyPolicy, TableConfig, DEFAULT_OUTPUT,
};
use fieldcheck_compare::normalize::NormalizeRule;
use fieldcheck_compare::CompareError;

use exit_codes::{compare_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "fieldcheck")]
#[command(about = "Compare two tables by primary key and write a Summary/Differences/Similarities report")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a comparison described by a TOML config file
    #[command(after_help = "\
Examples:
  fieldcheck run migration.toml
  fieldcheck run migration.toml --mode per-row -o rows.xlsx
  fieldcheck run migration.toml --json")]
    Run {
        /// Path to the config file
        config: PathBuf,

        /// Report path (overrides the config's `output`)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Classification mode (overrides the config's `mode`)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Compare two files directly, without a config file
    #[command(after_help = "\
Examples:
  fieldcheck compare source.xlsx target.xlsx --source-key Id --target-key ExtId
  fieldcheck compare a.csv b.csv --source-key Id --target-key Id --map Amount=Total --map Name=Name
  fieldcheck compare a.xlsx b.xlsx --source-key Id --target-key Id --date-column CloseDate --mode per-row

Without --map, every source column that also exists in the target is compared
with the same-named target column.")]
    Compare {
        /// Source table (csv, tsv, txt, xlsx, xls, xlsb, ods)
        source: PathBuf,

        /// Target table
        target: PathBuf,

        /// Primary key column in the source table
        #[arg(long, value_name = "COLUMN")]
        source_key: String,

        /// Primary key column in the target table
        #[arg(long, value_name = "COLUMN")]
        target_key: String,

        /// Column mapping, SOURCE=TARGET. Repeatable; order is kept.
        #[arg(long = "map", value_name = "SRC=TGT")]
        maps: Vec<String>,

        /// Normalize this mapped source column as a date on both sides. Repeatable.
        #[arg(long = "date-column", value_name = "SRC")]
        date_columns: Vec<String>,

        /// Worksheet to read from the source workbook
        #[arg(long)]
        source_sheet: Option<String>,

        /// Worksheet to read from the target workbook
        #[arg(long)]
        target_sheet: Option<String>,

        /// Classification mode
        #[arg(long, value_enum, default_value = "per-field")]
        mode: ModeArg,

        /// What to do when a key repeats within a table
        #[arg(long, value_enum, default_value = "error")]
        on_duplicate_key: DuplicateArg,

        /// Report path
        #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a config file without running it
    #[command(after_help = "\
Examples:
  fieldcheck validate migration.toml")]
    Validate {
        /// Path to the config file
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    PerField,
    PerRow,
}

impl From<ModeArg> for ClassificationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PerField => ClassificationMode::PerField,
            ModeArg::PerRow => ClassificationMode::PerRow,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplicateArg {
    Error,
    KeepLast,
}

impl From<DuplicateArg> for DuplicateKeyPolicy {
    fn from(policy: DuplicateArg) -> Self {
        match policy {
            DuplicateArg::Error => DuplicateKeyPolicy::Error,
            DuplicateArg::KeepLast => DuplicateKeyPolicy::KeepLast,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("warn"));

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            output,
            mode,
            json,
        } => cmd_run(config, output, mode, json),
        Commands::Compare {
            source,
            target,
            source_key,
            target_key,
            maps,
            date_columns,
            source_sheet,
            target_sheet,
            mode,
            on_duplicate_key,
            output,
            json,
        } => cmd_compare(CompareArgs {
            source: TableConfig {
                file: source,
                key: source_key,
                sheet: source_sheet,
            },
            target: TableConfig {
                file: target,
                key: target_key,
                sheet: target_sheet,
            },
            maps,
            date_columns,
            mode: mode.into(),
            on_duplicate_key: on_duplicate_key.into(),
            output,
            json,
        }),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Create error from a comparison error with its registered exit code.
    pub fn compare(err: CompareError) -> Self {
        let hint = match &err {
            CompareError::MissingKeyColumn { .. } | CompareError::MissingColumn { .. } => {
                Some("column names are matched exactly, including case and spaces".to_string())
            }
            CompareError::DuplicateKeys(_) => {
                Some("set on_duplicate_key = \"keep_last\" (or --on-duplicate-key keep-last) to keep the last row".to_string())
            }
            CompareError::NoAlignedRows { .. } => {
                Some("no primary key value appears in both tables; check the key columns".to_string())
            }
            _ => None,
        };
        Self { code: compare_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    config_path: PathBuf,
    output: Option<PathBuf>,
    mode: Option<ModeArg>,
    json: bool,
) -> Result<(), CliError> {
    let mut config = pipeline::load_config(&config_path).map_err(CliError::compare)?;
    if let Some(output) = output {
        config.output = output;
    }
    if let Some(mode) = mode {
        config.mode = mode.into();
    }

    let base_dir = pipeline::config_base_dir(&config_path);
    let outcome = pipeline::run_comparison(&config, base_dir).map_err(CliError::compare)?;
    report_outcome(&outcome, json)
}

// ============================================================================
// compare
// ============================================================================

struct CompareArgs {
    source: TableConfig,
    target: TableConfig,
    maps: Vec<String>,
    date_columns: Vec<String>,
    mode: ClassificationMode,
    on_duplicate_key: DuplicateKeyPolicy,
    output: PathBuf,
    json: bool,
}

fn cmd_compare(args: CompareArgs) -> Result<(), CliError> {
    let explicit: Vec<ColumnPair> = args
        .maps
        .iter()
        .map(|m| parse_map(m))
        .collect::<Result<_, _>>()?;

    let mut config = CompareConfig::new(args.source, args.target, explicit);
    config.name = "compare".into();
    config.mode = args.mode;
    config.on_duplicate_key = args.on_duplicate_key;
    config.output = args.output;

    let (source, target) =
        pipeline::load_inputs(&config, Path::new(".")).map_err(CliError::compare)?;

    if config.columns.is_empty() {
        config.columns = pipeline::same_name_pairs(&source, &config.source.key, &target);
        log::info!("mapped {} same-named column(s)", config.columns.len());
    }

    for column in &args.date_columns {
        let pair = config
            .columns
            .iter_mut()
            .find(|p| &p.source == column)
            .ok_or_else(|| CliError::args(format!("--date-column '{}' is not a mapped source column", column)))?;
        pair.normalize.push(NormalizeRule::date());
    }

    config.validate().map_err(|e| {
        let no_columns = config.columns.is_empty();
        let err = CliError::compare(e);
        if no_columns {
            err.with_hint("the tables share no column names besides the key; pass --map SRC=TGT")
        } else {
            err
        }
    })?;

    let outcome = pipeline::compare_and_write(&config, &source, &target).map_err(CliError::compare)?;
    report_outcome(&outcome, args.json)
}

/// Parse one `SRC=TGT` mapping.
fn parse_map(raw: &str) -> Result<ColumnPair, CliError> {
    match raw.split_once('=') {
        Some((source, target)) if !source.is_empty() && !target.is_empty() => {
            Ok(ColumnPair::new(source, target))
        }
        _ => Err(CliError::args(format!("invalid --map '{}'", raw))
            .with_hint("expected SOURCE=TARGET, e.g. --map Amount=Amount__c")),
    }
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = pipeline::load_config(&config_path).map_err(CliError::compare)?;

    eprintln!(
        "valid: '{}' ({}) with {} column pair(s), keys {} / {}",
        config.name,
        config.mode,
        config.columns.len(),
        config.source.key,
        config.target.key,
    );
    Ok(())
}

// ============================================================================
// output
// ============================================================================

fn report_outcome(outcome: &RunOutcome, json: bool) -> Result<(), CliError> {
    eprintln!("wrote {}", outcome.output.display());

    if json {
        let json_str = serde_json::to_string_pretty(outcome)
            .map_err(|e| CliError::args(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    let result = &outcome.result;
    for c in &result.columns {
        eprintln!(
            "  {}: {}/{} correct ({:.2}%)",
            c.field, c.correct_rows, c.total_rows, c.percentage_correct
        );
    }
    let s = &result.stats;
    eprintln!(
        "{} ({}): {} aligned of {} source / {} target rows; {} key(s) differ, {} key(s) match",
        result.meta.config_name,
        result.meta.mode,
        s.aligned_rows,
        s.source_rows,
        s.target_rows,
        s.difference_keys,
        s.similarity_keys,
    );
    Ok(())
}
