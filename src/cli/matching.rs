use std::io::Write;
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use tracing::info;

use crate::cli::MatchArgs;
use crate::config::ConfigOverrides;
use crate::corrections::load_overrides;
use crate::db;
use crate::error::Result;
use crate::fmt::{money, score};
use crate::history::{record_run, MatchRun};
use crate::importer::{compute_checksum, read_stream};
use crate::institution::InstitutionResolver;
use crate::matcher::{match_streams, MatchReport, Matcher};
use crate::reports::{audit_report, write_entries};
use crate::settings::load_settings;

pub fn run(args: &MatchArgs) -> Result<()> {
    let settings = load_settings()?;
    let overrides = ConfigOverrides {
        amount_epsilon: args.amount_epsilon,
        date_window_days: args.date_window_days,
        min_confidence: args.min_confidence,
    };
    let config = settings.matching.clone().with_overrides(&overrides);
    let matcher = Matcher::new(config)?;

    let conn = db::open(&settings)?;
    let matcher = matcher.with_resolver(InstitutionResolver::new(load_overrides(&conn)?));

    let path_a = Path::new(&args.stream_a);
    let path_b = Path::new(&args.stream_b);
    let a = read_stream(path_a, args.account_a.as_deref())?;
    let b = read_stream(path_b, args.account_b.as_deref())?;
    info!(a = a.len(), b = b.len(), "streams loaded");

    let report = match_streams(&a, &b, &matcher);

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_entries(file, &report.entries, args.format.into())?;
        }
        None => write_entries(std::io::stdout().lock(), &report.entries, args.format.into())?,
    }

    if let Some(path) = &args.report {
        let text = audit_report(&report, &args.stream_a, &args.stream_b, matcher.config());
        std::fs::write(path, text)?;
    }

    if !args.no_history {
        let run = MatchRun {
            id: None,
            ran_at: None,
            stream_a: args.stream_a.clone(),
            stream_b: args.stream_b.clone(),
            checksum_a: Some(compute_checksum(path_a)?),
            checksum_b: Some(compute_checksum(path_b)?),
            accepted: report.accepted_count(),
            rejected: report.rejected_count(),
            warnings: report.warnings.len(),
            min_confidence: matcher.config().min_confidence,
        };
        let id = record_run(&conn, &run)?;
        info!(run = id, "recorded match run");
    }

    // Keep stdout clean for the CSV when no output file was given.
    let summary = summary(&report, args.output.as_deref(), args.report.as_deref());
    if args.output.is_some() {
        println!("{summary}");
    } else {
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{summary}")?;
    }
    Ok(())
}

fn summary(report: &MatchReport, output: Option<&str>, report_path: Option<&str>) -> String {
    let mut out = format!(
        "{}  {}  {}",
        format!("{} accepted", report.accepted_count()).green().bold(),
        format!("{} rejected", report.rejected_count()).yellow(),
        if report.warnings.is_empty() {
            "0 warnings".normal()
        } else {
            format!("{} warnings", report.warnings.len()).red()
        }
    );

    if !report.entries.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Credit", "Debit", "Amount", "Confidence", "Matched"]);
        for e in &report.entries {
            table.add_row(vec![
                Cell::new(e.date),
                Cell::new(&e.credit_account),
                Cell::new(&e.debit_account),
                Cell::new(money(e.amount)),
                Cell::new(score(e.confidence)),
                Cell::new(format!("{} <-> {}", e.provenance.a, e.provenance.b)),
            ]);
        }
        out = format!("Corrected entries\n{table}\n{out}");
    }
    if let Some(path) = output {
        out.push_str(&format!("\nWrote {path}"));
    }
    if let Some(path) = report_path {
        out.push_str(&format!("\nAudit report: {path}"));
    }
    out
}
