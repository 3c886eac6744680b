// SalesGrid CLI - target vs actual dealership sales reconciliation

mod exit_codes;
mod inputs;
mod reconcile;
mod rules;
mod serve;
mod settings;
mod sheets;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use salesgrid_io::IoError;
use salesgrid_recon::ReconError;

use exit_codes::{io_exit_code, kind_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "sgrid")]
#[command(about = "Reconcile dealership sales targets against actuals")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Reconciliation rules TOML (overrides the settings file)
    #[arg(long, global = true, value_name = "TOML")]
    rules: Option<PathBuf>,

    /// Log heuristic decisions to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load files and list their sheets, keys and shapes
    #[command(after_help = "\
Examples:
  sgrid load 2024目標.xlsx 銷售統計.xlsx
  sgrid load actuals.csv --json")]
    Load {
        /// Workbooks (.xlsx .xlsm .xls .xlsb .ods) or delimited text (.csv .tsv .txt)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the first rows of a file's sheets
    #[command(after_help = "\
Examples:
  sgrid preview 2024目標.xlsx --sheet 上半年
  sgrid preview actuals.csv --rows 20 --json")]
    Preview {
        file: PathBuf,

        /// Sheet to preview (default: every sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Rows per sheet (capped at 50; default from settings)
        #[arg(long)]
        rows: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Classify files as target, actual, or unknown
    #[command(after_help = "\
Examples:
  sgrid classify *.xlsx
  sgrid classify 2024目標.xlsx 銷售統計.xlsx --json")]
    Classify {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Reconcile a target sheet against an actual sheet
    #[command(after_help = "\
Sheets are picked by classification when --target-sheet/--actual-sheet are
omitted. Writing --output with a .csv extension saves the merged table;
any other extension saves the JSON result.

Examples:
  sgrid reconcile 2024目標.xlsx 銷售統計.xlsx
  sgrid reconcile plan.xlsx sales.xlsx --target-sheet 上半年 --dealer 一號
  sgrid reconcile plan.xlsx sales.xlsx --json --output merged.csv")]
    Reconcile {
        /// Target file
        target: PathBuf,

        /// Actual file (may be the same workbook as the target)
        actual: PathBuf,

        #[arg(long)]
        target_sheet: Option<String>,

        #[arg(long)]
        actual_sheet: Option<String>,

        /// Restrict the summary to dealers whose name or code contains this text
        #[arg(long)]
        dealer: Option<String>,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,

        /// Write the result to a file (.csv = merged table, otherwise JSON)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Look up a dealer or site code in the code mapping table
    #[command(after_help = "\
Examples:
  sgrid resolve D001 --mapping 代碼對照.xlsx
  sgrid resolve S12 --json")]
    Resolve {
        code: String,

        /// Code mapping workbook (default from settings)
        #[arg(long)]
        mapping: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Answer JSONL tool calls on stdin/stdout
    #[command(after_help = "\
Each stdin line is one request: {\"id\":\"1\",\"tool\":\"list_datasets\",\"arguments\":{}}
Each stdout line is one response. Logs go to stderr.

Examples:
  sgrid serve --load 2024目標.xlsx --load 銷售統計.xlsx
  sgrid serve --load plan.xlsx --mapping 代碼對照.xlsx < calls.jsonl")]
    Serve {
        /// Files loaded into the registry before serving (repeatable)
        #[arg(long, value_name = "FILE")]
        load: Vec<PathBuf>,

        /// Code mapping workbook (default from settings)
        #[arg(long)]
        mapping: Option<PathBuf>,
    },

    /// Inspect reconciliation rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },

    /// Show or create the user settings file
    Settings {
        #[command(subcommand)]
        command: settings::SettingsCommands,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
        "\nprotocol_version: 1",
    )
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = inputs::Context::new(cli.rules);
    let result = match cli.command {
        Commands::Load { files, json } => sheets::cmd_load(&ctx, files, json),
        Commands::Preview { file, sheet, rows, json } => {
            sheets::cmd_preview(&ctx, file, sheet, rows, json)
        }
        Commands::Classify { files, json } => sheets::cmd_classify(&ctx, files, json),
        Commands::Reconcile {
            target,
            actual,
            target_sheet,
            actual_sheet,
            dealer,
            json,
            output,
        } => reconcile::cmd_reconcile(
            &ctx,
            reconcile::ReconcileArgs {
                target,
                actual,
                target_sheet,
                actual_sheet,
                dealer,
                json,
                output,
            },
        ),
        Commands::Resolve { code, mapping, json } => sheets::cmd_resolve(&ctx, code, mapping, json),
        Commands::Serve { load, mapping } => serve::cmd_serve(&ctx, load, mapping),
        Commands::Rules { command } => rules::cmd_rules(&ctx, command),
        Commands::Settings { command } => settings::cmd_settings(&ctx, command),
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

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::NotReconciled { .. } => Some("run `sgrid reconcile` first".to_string()),
            ReconError::MappingUnavailable => {
                Some("pass --mapping or set mapping_file in the settings file".to_string())
            }
            ReconError::MissingColumn { .. } => {
                Some("check the sheet's headers or adjust the rules with --rules".to_string())
            }
            _ => None,
        };
        Self { code: kind_exit_code(err.kind()), message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::Unsupported { .. } => {
                Some("supported: .xlsx .xlsm .xls .xlsb .ods .csv .tsv .txt".to_string())
            }
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }
}
