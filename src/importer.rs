use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::models::RawTransaction;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '$') && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return Decimal::from_str(inner).ok().map(|d| -d);
    }
    Decimal::from_str(&s).ok()
}

pub fn parse_date_mdy(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].parse().ok()?;
    let d: u32 = parts[1].parse().ok()?;
    let mut y: i32 = parts[2].parse().ok()?;
    if parts[2].len() == 2 {
        y += 2000;
    }
    NaiveDate::from_ymd_opt(y, m, d)
}

fn parse_date_ymd(raw: &str, sep: char) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split(sep).collect();
    if parts.len() != 3 || parts[0].len() != 4 {
        return None;
    }
    let y: i32 = parts[0].parse().ok()?;
    let m: u32 = parts[1].parse().ok()?;
    let d: u32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Accepts YYYY-MM-DD, YYYY/MM/DD, MM/DD/YYYY and MM/DD/YY, with an optional
/// trailing time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()
        .unwrap_or(raw);
    parse_date_ymd(day, '-')
        .or_else(|| parse_date_ymd(day, '/'))
        .or_else(|| parse_date_mdy(day))
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Header detection
// ---------------------------------------------------------------------------

const DATE_COLUMNS: &[&str] = &["date", "posting date", "posted date", "transaction date"];
const AMOUNT_COLUMNS: &[&str] = &["amount"];
const DESCRIPTION_COLUMNS: &[&str] = &["description", "payee", "memo", "details"];
const ACCOUNT_COLUMNS: &[&str] = &["account", "account name"];
const SOURCE_COLUMNS: &[&str] = &["source_file", "_source_file", "source", "source file"];

fn find_column(header: &StringRecord, aliases: &[&str]) -> Option<usize> {
    header.iter().position(|field| {
        let f = field.trim().to_lowercase();
        aliases.contains(&f.as_str())
    })
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    amount: usize,
    description: Option<usize>,
    account: Option<usize>,
    source_file: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Option<Self> {
        Some(Self {
            date: find_column(header, DATE_COLUMNS)?,
            amount: find_column(header, AMOUNT_COLUMNS)?,
            description: find_column(header, DESCRIPTION_COLUMNS),
            account: find_column(header, ACCOUNT_COLUMNS),
            source_file: find_column(header, SOURCE_COLUMNS),
        })
    }
}

fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> &'r str {
    idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}

// ---------------------------------------------------------------------------
// read_stream
// ---------------------------------------------------------------------------

/// Read one transaction stream. Rows are returned unvalidated; only a file without
/// a usable header (date and amount columns) is an error.
pub fn read_stream(file_path: &Path, default_account: Option<&str>) -> Result<Vec<RawTransaction>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let file_label = file_path.display().to_string();
    let mut columns: Option<Columns> = None;
    let mut saw_date_column = false;
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let Some(cols) = columns else {
            // Preamble lines before the header are skipped.
            if find_column(&record, DATE_COLUMNS).is_some() {
                saw_date_column = true;
            }
            columns = Columns::from_header(&record);
            if let Some(cols) = columns {
                if cols.account.is_none() && default_account.is_none() {
                    return Err(LedgerError::MissingColumn {
                        file: file_label,
                        column: "account",
                    });
                }
                debug!(file = %file_label, ?cols, "detected header");
            }
            continue;
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let account = match (cols.account, default_account) {
            (Some(idx), fallback) => {
                let value = field(&record, Some(idx));
                if value.is_empty() {
                    fallback.unwrap_or("").to_string()
                } else {
                    value.to_string()
                }
            }
            (None, fallback) => fallback.unwrap_or("").to_string(),
        };
        let source_file = match field(&record, cols.source_file) {
            "" => file_label.clone(),
            s => s.to_string(),
        };

        rows.push(RawTransaction {
            row: rows.len() + 1,
            date: parse_date(field(&record, Some(cols.date))),
            amount: parse_amount(field(&record, Some(cols.amount))),
            description: field(&record, cols.description).to_string(),
            account,
            source_file,
        });
    }

    if columns.is_none() {
        return Err(LedgerError::MissingColumn {
            file: file_label,
            column: if saw_date_column { "amount" } else { "date" },
        });
    }
    Ok(rows)
}
