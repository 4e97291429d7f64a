//! Duplicate detection inside a single stream.
//!
//! Advisory only: statements that overlap (two exports covering the same week, a
//! re-downloaded CSV) produce rows that look identical. The matcher still treats
//! them as distinct transactions; this module just tells the user about them.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::MAX_DATE_WINDOW_DAYS;
use crate::error::{LedgerError, Result};
use crate::models::{Transaction, TransactionId};

/// Fuzzy matches at or above this confidence are reported as likely duplicates.
pub const HIGH_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct DedupOptions {
    pub date_tolerance_days: i64,
    pub amount_tolerance: Decimal,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            date_tolerance_days: 3,
            amount_tolerance: Decimal::new(50, 2),
        }
    }
}

impl DedupOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_DATE_WINDOW_DAYS).contains(&self.date_tolerance_days) {
            return Err(LedgerError::InvalidConfig(format!(
                "date_tolerance_days must be between 0 and {MAX_DATE_WINDOW_DAYS} (got {})",
                self.date_tolerance_days
            )));
        }
        if self.amount_tolerance < Decimal::ZERO {
            return Err(LedgerError::InvalidConfig(format!(
                "amount_tolerance must be >= 0 (got {})",
                self.amount_tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatePair {
    /// The earlier row of the pair.
    pub original: TransactionId,
    pub duplicate: TransactionId,
    pub kind: DuplicateKind,
    pub confidence: f64,
}

impl DuplicatePair {
    pub fn is_likely(&self) -> bool {
        self.kind == DuplicateKind::Exact || self.confidence >= HIGH_CONFIDENCE
    }
}

fn normalize_description(desc: &str) -> String {
    desc.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 over account, date, amount and normalized description.
pub fn signature(txn: &Transaction) -> String {
    let payload = format!(
        "{}|{}|{}|{}",
        txn.account.trim().to_lowercase(),
        txn.date,
        txn.amount.normalize(),
        normalize_description(&txn.description)
    );
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

fn description_confidence(a: &str, b: &str) -> f64 {
    let a = normalize_description(a);
    let b = normalize_description(b);
    if a == b {
        0.9
    } else if a.contains(&b) || b.contains(&a) {
        0.7
    } else {
        0.5
    }
}

/// Every row whose signature was already seen, paired with the first row that had it.
pub fn find_exact(txns: &[Transaction]) -> Vec<DuplicatePair> {
    let mut first_seen: HashMap<String, TransactionId> = HashMap::new();
    let mut out = Vec::new();
    for txn in txns {
        let sig = signature(txn);
        match first_seen.get(&sig) {
            Some(&original) => out.push(DuplicatePair {
                original,
                duplicate: txn.id,
                kind: DuplicateKind::Exact,
                confidence: 1.0,
            }),
            None => {
                first_seen.insert(sig, txn.id);
            }
        }
    }
    out
}

/// Same account, close date and close amount, but not an exact duplicate.
pub fn find_fuzzy(txns: &[Transaction], opts: &DedupOptions) -> Vec<DuplicatePair> {
    let signatures: Vec<String> = txns.iter().map(signature).collect();
    let mut out = Vec::new();
    for (i, a) in txns.iter().enumerate() {
        for (j, b) in txns.iter().enumerate().skip(i + 1) {
            if signatures[i] == signatures[j] {
                continue;
            }
            if a.account.trim().to_lowercase() != b.account.trim().to_lowercase() {
                continue;
            }
            if (a.date - b.date).num_days().abs() > opts.date_tolerance_days {
                continue;
            }
            if (a.amount - b.amount).abs() > opts.amount_tolerance {
                continue;
            }
            let confidence = description_confidence(&a.description, &b.description);
            debug!(original = %a.id, duplicate = %b.id, confidence, "fuzzy duplicate");
            out.push(DuplicatePair {
                original: a.id,
                duplicate: b.id,
                kind: DuplicateKind::Fuzzy,
                confidence,
            });
        }
    }
    out
}

/// Exact duplicates first, then fuzzy ones by descending confidence.
pub fn find_duplicates(txns: &[Transaction], opts: &DedupOptions) -> Vec<DuplicatePair> {
    let mut out = find_exact(txns);
    let mut fuzzy = find_fuzzy(txns, opts);
    fuzzy.sort_by(|x, y| {
        y.confidence
            .total_cmp(&x.confidence)
            .then_with(|| (x.original, x.duplicate).cmp(&(y.original, y.duplicate)))
    });
    out.extend(fuzzy);
    out
}
