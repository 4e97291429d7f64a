pub mod config;
pub mod dedupe;
pub mod history;
pub mod init;
pub mod institutions;
pub mod matching;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::reports::Layout;

#[derive(Parser)]
#[command(
    name = "ledgermatch",
    version,
    about = "Match credit-card payments recorded in two ledgers and emit corrected double-entry records."
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings, create the data directory and initialize the database.
    Init {
        /// Path for ledgermatch data (default: ~/Documents/ledgermatch)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Match two transaction streams and write corrected entries.
    Match(MatchArgs),
    /// Report exact and fuzzy duplicates inside one stream.
    Dedupe {
        /// CSV file to inspect
        file: String,
        /// Account name when the file has no account column
        #[arg(long)]
        account: Option<String>,
        /// Days within which two rows may be duplicates
        #[arg(long = "date-tolerance-days", default_value_t = 3)]
        date_tolerance_days: i64,
        /// Largest amount difference for a fuzzy duplicate
        #[arg(long = "amount-tolerance", default_value = "0.50")]
        amount_tolerance: Decimal,
    },
    /// Manage institution corrections for statement files.
    Institutions {
        #[command(subcommand)]
        command: InstitutionsCommands,
    },
    /// List recorded match runs.
    History {
        /// Number of runs to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the effective matching configuration as JSON.
    Config,
}

#[derive(Args)]
pub struct MatchArgs {
    /// First stream (e.g. checking account CSV)
    pub stream_a: String,
    /// Second stream (e.g. credit card CSV)
    pub stream_b: String,
    /// Account name for stream A rows without an account column
    #[arg(long = "account-a")]
    pub account_a: Option<String>,
    /// Account name for stream B rows without an account column
    #[arg(long = "account-b")]
    pub account_b: Option<String>,
    /// Write corrected entries here instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
    /// Corrected-entry CSV layout
    #[arg(long, value_enum, default_value_t = OutputFormat::Entries)]
    pub format: OutputFormat,
    /// Write the audit report to this file
    #[arg(long)]
    pub report: Option<String>,
    #[arg(long = "amount-epsilon")]
    pub amount_epsilon: Option<Decimal>,
    #[arg(long = "date-window-days")]
    pub date_window_days: Option<i64>,
    #[arg(long = "min-confidence")]
    pub min_confidence: Option<f64>,
    /// Do not record this run in the history table
    #[arg(long = "no-history")]
    pub no_history: bool,
}

#[derive(Subcommand)]
pub enum InstitutionsCommands {
    /// Record which institution a statement file belongs to.
    Set {
        /// Statement file path, as it appears in the source_file column
        file: String,
        institution: String,
    },
    /// List every recorded correction, oldest first.
    List,
    /// Show the institution resolved for a statement file.
    Show { file: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One row per corrected entry
    Entries,
    /// Two signed posting rows per corrected entry
    Postings,
}

impl From<OutputFormat> for Layout {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Entries => Layout::Entries,
            OutputFormat::Postings => Layout::Postings,
        }
    }
}
