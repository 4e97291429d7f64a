use std::io::Write;

use serde::Serialize;

use crate::config::MatchConfig;
use crate::error::Result;
use crate::fmt::{money, score};
use crate::matcher::MatchReport;
use crate::models::{CorrectedEntry, Decision, DecisionRecord};

// ---------------------------------------------------------------------------
// Audit report
// ---------------------------------------------------------------------------

/// One line per decision, e.g.
/// `ACCEPTED  a:2 <-> b:5  score 0.78  $120.00  2024-03-01/2024-03-02  [amount match: $120.00]`.
pub fn decision_line(report: &MatchReport, record: &DecisionRecord) -> String {
    let c = &record.candidate;
    let ta = report.transaction(c.a);
    let tb = report.transaction(c.b);
    let amount = ta.map(|t| money(t.amount.abs())).unwrap_or_default();
    let dates = format!(
        "{}/{}",
        ta.map(|t| t.date.to_string()).unwrap_or_default(),
        tb.map(|t| t.date.to_string()).unwrap_or_default()
    );
    let reasons = format!("[{}]", c.factors.reasons.join("; "));

    let (status, outcome) = match &record.decision {
        Decision::Accepted => ("ACCEPTED", String::new()),
        Decision::BelowThreshold { threshold } => {
            ("REJECTED", format!("below threshold {}  ", score(*threshold)))
        }
        Decision::Superseded { by } => ("REJECTED", format!("superseded by {} <-> {}  ", by.0, by.1)),
    };

    format!(
        "{status}  {} <-> {}  score {}  {amount}  {dates}  {outcome}{reasons}",
        c.a,
        c.b,
        score(c.score)
    )
}

pub fn audit_report(report: &MatchReport, stream_a: &str, stream_b: &str, config: &MatchConfig) -> String {
    let mut out = String::new();
    out.push_str("Match report\n");
    out.push_str(&format!("Stream A: {stream_a}\n"));
    out.push_str(&format!("Stream B: {stream_b}\n"));
    out.push_str(&format!(
        "Config: amount_epsilon={} date_window_days={} min_confidence={}\n",
        config.amount_epsilon,
        config.date_window_days,
        score(config.min_confidence)
    ));
    out.push_str(&format!(
        "Candidates: {}  accepted: {}  rejected: {}  warnings: {}\n",
        report.decisions.len(),
        report.accepted_count(),
        report.rejected_count(),
        report.warnings.len()
    ));

    if !report.warnings.is_empty() {
        out.push_str("\nWarnings\n");
        for w in &report.warnings {
            out.push_str(&format!("  {w}\n"));
        }
    }

    out.push_str("\nDecisions\n");
    if report.decisions.is_empty() {
        out.push_str("  (no candidate pairs)\n");
    }
    for record in &report.decisions {
        out.push_str(&decision_line(report, record));
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Corrected-entry CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One row per corrected entry.
    Entries,
    /// Two signed posting rows per corrected entry.
    Postings,
}

#[derive(Serialize)]
struct EntryRow<'a> {
    date: String,
    description: &'a str,
    debit_account: &'a str,
    credit_account: &'a str,
    amount: String,
    confidence: String,
    a_id: String,
    b_id: String,
    a_source_file: &'a str,
    b_source_file: &'a str,
    reasons: String,
}

#[derive(Serialize)]
struct PostingRow<'a> {
    date: String,
    description: &'a str,
    account: &'a str,
    amount: String,
    source_file: &'a str,
    match_confidence: String,
    match_reasons: String,
}

pub fn write_entries<W: Write>(writer: W, entries: &[CorrectedEntry], layout: Layout) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for e in entries {
        let reasons = e.provenance.reasons.join("; ");
        let confidence = format!("{:.4}", e.confidence);
        match layout {
            Layout::Entries => wtr.serialize(EntryRow {
                date: e.date.to_string(),
                description: &e.description,
                debit_account: &e.debit_account,
                credit_account: &e.credit_account,
                amount: e.amount.to_string(),
                confidence,
                a_id: e.provenance.a.to_string(),
                b_id: e.provenance.b.to_string(),
                a_source_file: &e.provenance.a_source_file,
                b_source_file: &e.provenance.b_source_file,
                reasons,
            })?,
            Layout::Postings => {
                wtr.serialize(PostingRow {
                    date: e.date.to_string(),
                    description: &e.description,
                    account: &e.credit_account,
                    amount: (-e.amount).to_string(),
                    source_file: e.provenance.credit_source_file(),
                    match_confidence: confidence.clone(),
                    match_reasons: reasons.clone(),
                })?;
                wtr.serialize(PostingRow {
                    date: e.date.to_string(),
                    description: &e.description,
                    account: &e.debit_account,
                    amount: e.amount.to_string(),
                    source_file: e.provenance.debit_source_file(),
                    match_confidence: confidence,
                    match_reasons: reasons,
                })?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}
