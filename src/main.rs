mod cli;
mod config;
mod corrections;
mod db;
mod dedup;
mod error;
mod fmt;
mod history;
mod importer;
mod institution;
mod matcher;
mod models;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, InstitutionsCommands};

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ledgermatch={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Match(args) => cli::matching::run(&args),
        Commands::Dedupe {
            file,
            account,
            date_tolerance_days,
            amount_tolerance,
        } => cli::dedupe::run(&file, account.as_deref(), date_tolerance_days, amount_tolerance),
        Commands::Institutions { command } => match command {
            InstitutionsCommands::Set { file, institution } => cli::institutions::set(&file, &institution),
            InstitutionsCommands::List => cli::institutions::list(),
            InstitutionsCommands::Show { file } => cli::institutions::show(&file),
        },
        Commands::History { limit } => cli::history::run(limit),
        Commands::Config => cli::config::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
