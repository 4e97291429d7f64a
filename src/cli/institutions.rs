use comfy_table::{Cell, Table};

use crate::corrections::{latest_for, list_corrections, record_correction};
use crate::db;
use crate::error::Result;
use crate::institution::{canonical_name, institution_in_text};
use crate::settings::load_settings;

pub fn set(file: &str, institution: &str) -> Result<()> {
    let conn = db::open(&load_settings()?)?;
    record_correction(&conn, file, institution)?;
    println!("Recorded: {file} -> {}", canonical_name(institution));
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = db::open(&load_settings()?)?;
    let corrections = list_corrections(&conn)?;
    if corrections.is_empty() {
        println!("No institution corrections recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Path", "Institution", "Recorded", "Fingerprint"]);
    for c in corrections {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(c.path),
            Cell::new(canonical_name(&c.institution)),
            Cell::new(c.created_at),
            Cell::new(c.fingerprint.get(..12).unwrap_or_default()),
        ]);
    }
    println!("Institution corrections\n{table}");
    Ok(())
}

pub fn show(file: &str) -> Result<()> {
    let conn = db::open(&load_settings()?)?;
    if let Some(c) = latest_for(&conn, file)? {
        println!("{file}: {} (correction #{}, {})", canonical_name(&c.institution), c.id, c.created_at);
    } else if let Some(name) = institution_in_text(file) {
        println!("{file}: {name} (inferred from path)");
    } else {
        println!("{file}: no institution found");
    }
    Ok(())
}
