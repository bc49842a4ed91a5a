pub mod export;
pub mod generate;
pub mod init;
pub mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;

use crate::error::Result;
use crate::generator::{GeneratorSource, DEFAULT_SEED};
use crate::models::{Period, Record, TargetRecord};
use crate::settings::{load_settings, shellexpand_path, Settings};
use crate::source::{load_target, load_transactions, DataSource, DirSource};

#[derive(Parser, Debug)]
#[command(
    name = "rekap",
    about = "Monthly budget target vs. actual reconciliation and CSV export."
)]
pub struct Cli {
    /// Logging verbosity: off, error, warn, info, debug, trace. RUST_LOG overrides this.
    #[arg(long = "log-level", global = true, default_value_t = LevelFilter::WARN)]
    pub log_level: LevelFilter,

    /// Directory holding target-YYYY-MM.json and transactions-YYYY-MM.{json,csv}
    #[arg(long = "data-dir", global = true, env = "REKAP_DATA_DIR")]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save settings and create the data directory.
    Init,
    /// Show the target for a month, by category, with its total.
    Target {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the daily transactions for a month.
    Transactions {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Compare target against actual spending per category.
    Variance {
        #[command(flatten)]
        input: InputArgs,
        /// Also list transactions whose category is not in the target
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Target, variance and transactions together.
    Report {
        #[command(flatten)]
        input: InputArgs,
        /// Also list transactions whose category is not in the target
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Generate a month's transactions from its target and save them as JSON.
    Generate {
        #[command(flatten)]
        input: InputArgs,
        /// Output path (default: <data_dir>/transactions-YYYY-MM.json)
        #[arg(long)]
        output: Option<String>,
        /// Replace an existing transactions file
        #[arg(long)]
        force: bool,
    },
    /// Export the transactions as CSV.
    Export {
        #[command(flatten)]
        input: InputArgs,
        /// Output path (default: <export_dir>/expense_data_<year>_<month>.csv)
        #[arg(long, conflicts_with = "stdout")]
        output: Option<String>,
        /// Print the CSV instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
}

/// Where the target and transactions come from.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Month: YYYY-MM (default: current month)
    #[arg(long)]
    pub month: Option<String>,
    /// Target JSON file, instead of looking it up in the data directory
    #[arg(long)]
    pub target: Option<PathBuf>,
    /// Transactions JSON or CSV file, instead of looking it up in the data directory
    #[arg(long, conflicts_with = "generate")]
    pub transactions: Option<PathBuf>,
    /// Generate the transactions from the target instead of loading them
    #[arg(long)]
    pub generate: bool,
    /// Seed for generated transactions
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

impl Default for InputArgs {
    fn default() -> Self {
        Self {
            month: None,
            target: None,
            transactions: None,
            generate: false,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn run(cli: Cli) -> Result<String> {
    let mut settings = load_settings();
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = shellexpand_path(dir);
    }
    debug!("Data dir: {}", settings.data_dir);

    match cli.command {
        Commands::Init => init::run(settings, cli.data_dir.is_some()),
        Commands::Target { input, format } => report::target(&settings, &input, format),
        Commands::Transactions { input, format } => {
            report::transactions(&settings, &input, format)
        }
        Commands::Variance {
            input,
            strict,
            format,
        } => report::variance(&settings, &input, strict, format),
        Commands::Report {
            input,
            strict,
            format,
        } => report::all(&settings, &input, strict, format),
        Commands::Generate {
            input,
            output,
            force,
        } => generate::run(&settings, &input, output, force),
        Commands::Export {
            input,
            output,
            stdout,
        } => export::run(&settings, &input, output, stdout),
    }
}

fn resolve_period(month: &Option<String>) -> Result<Period> {
    match month {
        Some(m) => m.parse(),
        None => Ok(Period::current()),
    }
}

pub(crate) fn fetch_target(settings: &Settings, input: &InputArgs) -> Result<TargetRecord> {
    match &input.target {
        Some(path) => load_target(path),
        None => DirSource::new(settings.data_dir()).fetch_target(resolve_period(&input.month)?),
    }
}

/// Transactions are only ever loaded for a target that is already in hand.
pub(crate) fn fetch_transactions(
    settings: &Settings,
    input: &InputArgs,
    target: &TargetRecord,
) -> Result<Vec<Record>> {
    let dir = DirSource::new(settings.data_dir());
    if input.generate {
        return GeneratorSource::new(dir)
            .with_seed(input.seed)
            .fetch_transactions(target);
    }
    match &input.transactions {
        Some(path) => load_transactions(path),
        None => dir.fetch_transactions(target),
    }
}
