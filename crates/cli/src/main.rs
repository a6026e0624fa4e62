// stockcheck CLI - inventory vs reception reconciliation

mod compare;
mod exit_codes;
mod tui;
mod util;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stockcheck_config::Settings;
use stockcheck_recon::ReconError;

use compare::{cmd_compare, export_options, load_upload, print_filter_warning, print_plain, CompareArgs};
use exit_codes::{recon_exit_code, EXIT_EXPORT, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

/// Environment variable holding the log filter (env_logger syntax)
const LOG_ENV: &str = "STOCKCHECK_LOG";

#[derive(Parser)]
#[command(name = "stockcheck")]
#[command(about = "Reconcile an inventory count against goods received")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Verbose logging to stderr (same as STOCKCHECK_LOG=debug)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the Inventaire and Reception sheets of a workbook
    #[command(after_help = "\
The workbook needs two sheets:
  Inventaire   Code article, Libelle (optional), Qte inventaire
  Reception    Code article, Libelle (optional), Qte recue (UVC)

Rows whose quantities differ are marked with * (and highlighted on a terminal).

Examples:
  stockcheck compare stock.xlsx
  stockcheck compare stock.xlsx --filter 'lait|beurre'
  stockcheck compare stock.xlsx -o Comparaison_Inventaire_Reception.xlsx
  stockcheck compare stock.xlsx --json | jq '.summary'
  stockcheck compare stock.xlsx --fail-on-diff -q > /dev/null")]
    Compare {
        /// Workbook to reconcile (xlsx, xlsm, xls, xlsb, ods)
        file: PathBuf,

        /// Case-insensitive regular expression matched against code and labels
        #[arg(long, short = 'f', default_value = "")]
        filter: String,

        /// Write the highlighted report workbook to this path
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the report as JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Rows printed per partition (0 = all; default from settings)
        #[arg(long, value_name = "N")]
        max_rows: Option<usize>,

        /// Exit 1 when any row has differing quantities
        #[arg(long)]
        fail_on_diff: bool,

        /// Suppress stderr notes
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Browse the comparison interactively
    #[command(after_help = "\
Keys: Tab switches partition, / edits the filter, w writes the report,
? shows help, q quits. Without a terminal the tables are printed instead.

Examples:
  stockcheck view stock.xlsx
  stockcheck view stock.xlsx --filter '^10'")]
    View {
        /// Workbook to reconcile
        file: PathBuf,

        /// Initial filter
        #[arg(long, short = 'f', default_value = "")]
        filter: String,
    },

    /// Print the settings file path
    Settings {
        /// Print the effective settings as JSON
        #[arg(long)]
        show: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    let _ = builder.format_timestamp(None).try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: stockcheck <command> [options]");
            eprintln!("       stockcheck --help for more information");
            Err(CliError::args(""))
        }
        Some(Commands::Compare {
            file,
            filter,
            output,
            json,
            max_rows,
            fail_on_diff,
            quiet,
        }) => cmd_compare(CompareArgs { file, filter, output, json, max_rows, fail_on_diff, quiet }),
        Some(Commands::View { file, filter }) => cmd_view(file, filter),
        Some(Commands::Settings { show }) => cmd_settings(show),
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

    pub fn export(msg: impl Into<String>) -> Self {
        Self { code: EXIT_EXPORT, message: msg.into(), hint: None }
    }

    /// Create error from a reconciliation error with proper exit code.
    pub fn recon(err: &ReconError) -> Self {
        Self { code: recon_exit_code(err), message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// view
// ============================================================================

fn cmd_view(file: PathBuf, filter: String) -> Result<(), CliError> {
    let settings = Settings::load();
    let upload = load_upload(&file)?;

    // No terminal: fall back to plain tables so pipes still get output
    if !atty::is(atty::Stream::Stdout) {
        let evaluation = upload.evaluate(&filter);
        if let Some(warning) = &evaluation.warning {
            print_filter_warning(warning);
        }
        let stdout = io::stdout();
        let mut w = stdout.lock();
        return print_plain(&mut w, &evaluation, settings.max_rows.unwrap_or(0), None)
            .map_err(|e| CliError::io(format!("failed to write output: {}", e)));
    }

    let config = tui::ViewConfig {
        export: export_options(&settings),
        export_path: PathBuf::from(settings.export_file_name()),
    };
    tui::run(upload, filter, config).map_err(|e| CliError::io(format!("terminal error: {}", e)))
}

// ============================================================================
// settings
// ============================================================================

fn cmd_settings(show: bool) -> Result<(), CliError> {
    if show {
        let settings = Settings::load();
        let json = serde_json::to_string_pretty(&settings)
            .map_err(|e| CliError::io(format!("failed to serialize settings: {}", e)))?;
        println!("{}", json);
    } else {
        println!("{}", Settings::config_path_display());
    }
    Ok(())
}
