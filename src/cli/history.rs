use comfy_table::{Cell, Table};

use crate::db;
use crate::error::Result;
use crate::fmt::score;
use crate::history::list_runs;
use crate::settings::load_settings;

pub fn run(limit: usize) -> Result<()> {
    let conn = db::open(&load_settings()?)?;
    let runs = list_runs(&conn, limit)?;
    if runs.is_empty() {
        println!("No match runs recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Ran At", "Stream A", "Stream B", "Accepted", "Rejected", "Warnings", "Min Conf",
    ]);
    for run in runs {
        table.add_row(vec![
            Cell::new(run.id.unwrap_or_default()),
            Cell::new(run.ran_at.unwrap_or_default()),
            Cell::new(run.stream_a),
            Cell::new(run.stream_b),
            Cell::new(run.accepted),
            Cell::new(run.rejected),
            Cell::new(run.warnings),
            Cell::new(score(run.min_confidence)),
        ]);
    }
    println!("Match history\n{table}");
    Ok(())
}
