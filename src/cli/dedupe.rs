use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::dedup::{find_duplicates, DedupOptions, DuplicateKind};
use crate::error::Result;
use crate::fmt::{money, score};
use crate::importer::read_stream;
use crate::matcher::validate_stream;
use crate::models::Side;

pub fn run(
    file: &str,
    account: Option<&str>,
    date_tolerance_days: i64,
    amount_tolerance: Decimal,
) -> Result<()> {
    let opts = DedupOptions {
        date_tolerance_days,
        amount_tolerance,
    };
    opts.validate()?;
    let rows = read_stream(Path::new(file), account)?;
    let (txns, malformed) = validate_stream(Side::A, &rows);
    let dups = find_duplicates(&txns, &opts);

    if !malformed.is_empty() {
        println!("{}", format!("Skipped {} malformed row(s)", malformed.len()).yellow());
    }
    if dups.is_empty() {
        println!("No duplicates found in {} row(s).", txns.len());
        return Ok(());
    }

    let row_of = |id| txns.iter().find(|t| t.id == id);
    let mut table = Table::new();
    table.set_header(vec!["Kind", "Rows", "Date", "Amount", "Description", "Confidence"]);
    for d in &dups {
        let kind = match d.kind {
            DuplicateKind::Exact => "exact".red().bold(),
            DuplicateKind::Fuzzy if d.is_likely() => "likely".yellow(),
            DuplicateKind::Fuzzy => "possible".normal(),
        };
        let (date, amount, desc) = row_of(d.duplicate)
            .map(|t| (t.date.to_string(), money(t.amount), t.description.clone()))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(kind),
            Cell::new(format!("{} / {}", d.original.row, d.duplicate.row)),
            Cell::new(date),
            Cell::new(amount),
            Cell::new(desc),
            Cell::new(score(d.confidence)),
        ]);
    }
    println!("Duplicates in {file}\n{table}");
    Ok(())
}
