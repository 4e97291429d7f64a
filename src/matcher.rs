//! Cross-account payment matching.
//!
//! Two independently recorded ledgers (typically a checking account and a credit
//! card) both record the same real-world payment. The matcher joins the two streams
//! on approximate amount and date proximity, scores each candidate pair, keeps at
//! most one accepted match per transaction and turns every accepted match into a
//! single double-entry [`CorrectedEntry`].

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::config::MatchConfig;
use crate::error::Result;
use crate::fmt::money;
use crate::institution::{description_similarity, institution_in_text, is_payment, statement_period, InstitutionResolver};
use crate::models::{
    CorrectedEntry, Decision, DecisionRecord, MalformedRecord, MatchCandidate, Provenance,
    RawTransaction, ScoreBreakdown, Side, Transaction, TransactionId,
};

/// Descriptions shorter than this are replaced by the counterpart's description.
const MIN_DESCRIPTION_LEN: usize = 10;

/// Everything one matching pass produced.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    pub a: Vec<Transaction>,
    pub b: Vec<Transaction>,
    pub entries: Vec<CorrectedEntry>,
    pub decisions: Vec<DecisionRecord>,
    pub warnings: Vec<MalformedRecord>,
}

impl MatchReport {
    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        let stream = match id.side {
            Side::A => &self.a,
            Side::B => &self.b,
        };
        stream.iter().find(|t| t.id == id)
    }

    pub fn accepted_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.decision.is_accepted()).count()
    }

    pub fn rejected_count(&self) -> usize {
        self.decisions.len() - self.accepted_count()
    }
}

pub struct Matcher {
    config: MatchConfig,
    resolver: InstitutionResolver,
}

impl Matcher {
    /// Fails when the configuration is out of range.
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            resolver: InstitutionResolver::default(),
        })
    }

    pub fn with_resolver(mut self, resolver: InstitutionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Score a pair, or `None` when it fails the amount/date join or both sides
    /// are the same account.
    pub fn score_pair(&self, a: &Transaction, b: &Transaction) -> Option<MatchCandidate> {
        let cfg = &self.config;
        if a.account.to_lowercase() == b.account.to_lowercase() {
            return None;
        }
        let amount_delta = (a.amount.abs() - b.amount.abs()).abs();
        if amount_delta > cfg.amount_epsilon {
            return None;
        }
        let date_delta_days = (a.date - b.date).num_days().abs();
        if date_delta_days > cfg.date_window_days {
            return None;
        }

        let mut reasons = Vec::new();

        let amount = if amount_delta.is_zero() {
            reasons.push(format!("amount match: {}", money(a.amount.abs())));
            1.0
        } else {
            let ratio = (amount_delta / cfg.amount_epsilon).to_f64().unwrap_or(1.0);
            reasons.push(format!(
                "amount close: {} vs {} (diff {})",
                money(a.amount.abs()),
                money(b.amount.abs()),
                amount_delta
            ));
            1.0 - 0.5 * ratio
        };

        let date = if cfg.date_window_days == 0 {
            1.0
        } else {
            1.0 - date_delta_days as f64 / cfg.date_window_days as f64
        };
        match date_delta_days {
            0 => reasons.push("same date".to_string()),
            1 => reasons.push("dates 1 day apart".to_string()),
            n => reasons.push(format!("dates {n} days apart")),
        }

        let overlap = description_similarity(&a.description, &b.description);
        let both_payments = is_payment(&a.description) && is_payment(&b.description);
        let description = (overlap + if both_payments { 0.5 } else { 0.0 }).min(1.0);
        if both_payments {
            reasons.push("both payment descriptions".to_string());
        }
        if overlap > 0.0 {
            reasons.push(format!("description overlap {overlap:.2}"));
        }

        let named_a = institution_in_text(&a.description);
        let named_b = institution_in_text(&b.description);
        let account_a = institution_in_text(&a.account);
        let account_b = institution_in_text(&b.account);
        let account_hint = account_hint_factor(named_a, named_b, account_a, account_b, &mut reasons);

        let source_a = self.resolver.source_institution(&a.source_file);
        let source_b = self.resolver.source_institution(&b.source_file);
        let source_file = if named_a.is_some() && source_b.as_deref() == named_a {
            reasons.push(format!("source file from {}", source_b.as_deref().unwrap_or_default()));
            1.0
        } else if named_b.is_some() && source_a.as_deref() == named_b {
            reasons.push(format!("source file from {}", source_a.as_deref().unwrap_or_default()));
            1.0
        } else {
            match (statement_period(&a.source_file), statement_period(&b.source_file)) {
                (Some(pa), Some(pb)) if pa == pb => {
                    reasons.push(format!("same statement period {}-{:02}", pa.0, pa.1));
                    0.5
                }
                _ => 0.0,
            }
        };

        let w = &cfg.weights;
        let score = (w.amount * amount
            + w.date * date
            + w.description * description
            + w.account_hint * account_hint
            + w.source_file * source_file)
            / w.total();

        Some(MatchCandidate {
            a: a.id,
            b: b.id,
            score: score.clamp(0.0, 1.0),
            factors: ScoreBreakdown {
                amount_delta,
                date_delta_days,
                amount,
                date,
                description,
                account_hint,
                source_file,
                reasons,
            },
        })
    }

    /// All pairs that pass the amount/date join, scored.
    pub fn candidates(&self, a: &[Transaction], b: &[Transaction]) -> Vec<MatchCandidate> {
        let mut b_by_date: Vec<&Transaction> = b.iter().collect();
        b_by_date.sort_by_key(|t| t.date);

        let window = Days::new(self.config.date_window_days.max(0).unsigned_abs());
        let mut out = Vec::new();
        for ta in a {
            let lo = ta.date.checked_sub_days(window).unwrap_or(NaiveDate::MIN);
            let hi = ta.date.checked_add_days(window).unwrap_or(NaiveDate::MAX);
            let start = b_by_date.partition_point(|t| t.date < lo);
            for tb in b_by_date[start..].iter().take_while(|t| t.date <= hi) {
                if let Some(candidate) = self.score_pair(ta, tb) {
                    debug!(a = %ta.id, b = %tb.id, score = candidate.score, "candidate");
                    out.push(candidate);
                }
            }
        }
        out
    }

    /// Match two validated streams.
    #[instrument(name = "match", skip_all, fields(a = a.len(), b = b.len()))]
    pub fn match_transactions(&self, a: &[Transaction], b: &[Transaction]) -> MatchReport {
        let lookup: HashMap<TransactionId, &Transaction> =
            a.iter().chain(b.iter()).map(|t| (t.id, t)).collect();

        let mut ranked = self.candidates(a, b);
        ranked.sort_by(|x, y| rank(x, y, &lookup));

        let threshold = self.config.min_confidence;
        let mut claimed: HashMap<TransactionId, (TransactionId, TransactionId)> = HashMap::new();
        let mut decisions = Vec::with_capacity(ranked.len());
        let mut entries = Vec::new();

        for candidate in ranked {
            // A NaN score never clears the threshold.
            let decision = if !candidate.score.is_finite() || candidate.score < threshold {
                Decision::BelowThreshold { threshold }
            } else if let Some(&by) = claimed.get(&candidate.a).or_else(|| claimed.get(&candidate.b)) {
                Decision::Superseded { by }
            } else {
                let pair = (candidate.a, candidate.b);
                claimed.insert(candidate.a, pair);
                claimed.insert(candidate.b, pair);
                if let (Some(ta), Some(tb)) = (lookup.get(&candidate.a), lookup.get(&candidate.b)) {
                    entries.push(corrected_entry(ta, tb, &candidate));
                }
                Decision::Accepted
            };
            decisions.push(DecisionRecord { candidate, decision });
        }

        entries.sort_by(|x, y| {
            x.date
                .cmp(&y.date)
                .then_with(|| x.credit_account.cmp(&y.credit_account))
                .then_with(|| x.debit_account.cmp(&y.debit_account))
                .then_with(|| x.amount.cmp(&y.amount))
                .then_with(|| x.description.cmp(&y.description))
                .then_with(|| (x.provenance.a, x.provenance.b).cmp(&(y.provenance.a, y.provenance.b)))
        });

        info!(
            candidates = decisions.len(),
            accepted = entries.len(),
            "matching complete"
        );

        MatchReport {
            a: a.to_vec(),
            b: b.to_vec(),
            entries,
            decisions,
            warnings: Vec::new(),
        }
    }
}

fn account_hint_factor(
    named_a: Option<&str>,
    named_b: Option<&str>,
    account_a: Option<&str>,
    account_b: Option<&str>,
    reasons: &mut Vec<String>,
) -> f64 {
    // A description naming an institution is checked against the other side's account.
    let checks = [(named_a, account_b), (named_b, account_a)];
    if let Some(name) = checks
        .iter()
        .find_map(|(named, account)| named.filter(|n| Some(*n) == *account))
    {
        reasons.push(format!("card name match: {name}"));
        return 1.0;
    }
    if let Some((named, account)) = checks.iter().find_map(|(named, account)| match (named, account) {
        (Some(n), Some(acct)) => Some((*n, *acct)),
        _ => None,
    }) {
        reasons.push(format!("card name mismatch: {named} vs {account}"));
        return 0.0;
    }
    if let Some(name) = named_a.or(named_b).or(account_a).or(account_b) {
        reasons.push(format!("partial card match: {name}"));
        return 0.5;
    }
    0.0
}

/// Ranking used for conflict resolution: higher score, then smaller date delta,
/// then smaller source files, then transaction content, then row ids.
fn rank(x: &MatchCandidate, y: &MatchCandidate, lookup: &HashMap<TransactionId, &Transaction>) -> Ordering {
    let content = |c: &MatchCandidate| {
        let ta = lookup.get(&c.a).copied();
        let tb = lookup.get(&c.b).copied();
        (
            ta.map(|t| t.source_file.as_str()),
            tb.map(|t| t.source_file.as_str()),
            ta.map(|t| t.date),
            tb.map(|t| t.date),
            ta.map(|t| t.amount),
            tb.map(|t| t.amount),
            ta.map(|t| (t.description.as_str(), t.account.as_str())),
            tb.map(|t| (t.description.as_str(), t.account.as_str())),
        )
    };
    y.score
        .total_cmp(&x.score)
        .then_with(|| x.factors.date_delta_days.cmp(&y.factors.date_delta_days))
        .then_with(|| content(x).cmp(&content(y)))
        .then_with(|| (x.a, x.b).cmp(&(y.a, y.b)))
}

fn corrected_entry(a: &Transaction, b: &Transaction, candidate: &MatchCandidate) -> CorrectedEntry {
    let opposite_signs = (a.amount < Decimal::ZERO && b.amount > Decimal::ZERO)
        || (a.amount > Decimal::ZERO && b.amount < Decimal::ZERO);
    // The outflow side pays; with matching signs stream A is the paying ledger.
    let (credit, debit) = if opposite_signs && a.amount > Decimal::ZERO {
        (b, a)
    } else {
        (a, b)
    };
    let credit_side = credit.id.side;

    let description = if a.description.chars().count() >= MIN_DESCRIPTION_LEN || b.description.is_empty() {
        a.description.clone()
    } else {
        b.description.clone()
    };

    CorrectedEntry {
        date: a.date,
        description,
        debit_account: debit.account.clone(),
        credit_account: credit.account.clone(),
        amount: a.amount.abs(),
        confidence: candidate.score,
        provenance: Provenance {
            a: a.id,
            b: b.id,
            a_source_file: a.source_file.clone(),
            b_source_file: b.source_file.clone(),
            credit_side,
            reasons: candidate.factors.reasons.clone(),
        },
    }
}

/// Validate raw rows, logging and collecting the ones that cannot be matched.
pub fn validate_stream(side: Side, rows: &[RawTransaction]) -> (Vec<Transaction>, Vec<MalformedRecord>) {
    let mut valid = Vec::with_capacity(rows.len());
    let mut malformed = Vec::new();
    for row in rows {
        match row.validate(side) {
            Ok(txn) => valid.push(txn),
            Err(record) => {
                warn!(id = %record.id, source = %record.source_file, "skipping record: {}", record.reason);
                malformed.push(record);
            }
        }
    }
    (valid, malformed)
}

/// Validate both streams and match what survives.
pub fn match_streams(a: &[RawTransaction], b: &[RawTransaction], matcher: &Matcher) -> MatchReport {
    let (valid_a, mut warnings) = validate_stream(Side::A, a);
    let (valid_b, warnings_b) = validate_stream(Side::B, b);
    warnings.extend(warnings_b);

    let mut report = matcher.match_transactions(&valid_a, &valid_b);
    report.warnings = warnings;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreWeights;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(side: Side, row: usize, d: NaiveDate, amount: Decimal, desc: &str, account: &str) -> Transaction {
        Transaction {
            id: TransactionId::new(side, row),
            date: d,
            amount,
            description: desc.to_string(),
            account: account.to_string(),
            source_file: format!("{}.csv", side.label()),
        }
    }

    fn matcher() -> Matcher {
        Matcher::new(MatchConfig::default()).unwrap()
    }

    /// Accepted (a, b) pairs by content, independent of row ids.
    fn accepted_content(report: &MatchReport) -> BTreeSet<(NaiveDate, String, String, String, String)> {
        report
            .entries
            .iter()
            .map(|e| {
                let a = report.transaction(e.provenance.a).unwrap();
                let b = report.transaction(e.provenance.b).unwrap();
                (a.date, a.description.clone(), b.description.clone(), b.account.clone(), b.date.to_string())
            })
            .collect()
    }

    #[test]
    fn test_amex_payment_example() {
        let a = vec![txn(Side::A, 1, date(2024, 3, 1), dec!(-120.00), "AMEX PAYMENT", "Checking")];
        let b = vec![txn(Side::B, 1, date(2024, 3, 2), dec!(120.00), "PAYMENT THANK YOU", "Amex")];
        let report = matcher().match_transactions(&a, &b);

        assert_eq!(report.entries.len(), 1);
        let entry = &report.entries[0];
        assert!(entry.confidence >= 0.60, "confidence {}", entry.confidence);
        assert_eq!(entry.credit_account, "Checking");
        assert_eq!(entry.debit_account, "Amex");
        assert_eq!(entry.amount, dec!(120.00));
        assert_eq!(entry.date, date(2024, 3, 1));
        assert_eq!(entry.provenance.a, TransactionId::new(Side::A, 1));
        assert_eq!(entry.provenance.b, TransactionId::new(Side::B, 1));
        assert!(entry.provenance.reasons.iter().any(|r| r.contains("card name match: American Express")));
    }

    #[test]
    fn test_score_breakdown_for_example() {
        let a = txn(Side::A, 1, date(2024, 3, 1), dec!(-120.00), "AMEX PAYMENT", "Checking");
        let b = txn(Side::B, 1, date(2024, 3, 2), dec!(120.00), "PAYMENT THANK YOU", "Amex");
        let c = matcher().score_pair(&a, &b).unwrap();
        assert_eq!(c.factors.amount, 1.0);
        assert_eq!(c.factors.date_delta_days, 1);
        assert!((c.factors.date - 2.0 / 3.0).abs() < 1e-9);
        assert!((c.factors.description - 0.75).abs() < 1e-9);
        assert_eq!(c.factors.account_hint, 1.0);
        assert_eq!(c.factors.source_file, 0.0);
        let expected = 0.35 + 0.25 * (2.0 / 3.0) + 0.15 * 0.75 + 0.15;
        assert!((c.score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_date_decay() {
        let m = matcher();
        let a = txn(Side::A, 1, date(2024, 3, 10), dec!(-80.00), "ONLINE PMT CARD", "Checking");
        let same_day = txn(Side::B, 1, date(2024, 3, 10), dec!(80.00), "ONLINE PMT CARD", "Card");
        let three_days_mismatch = txn(Side::B, 2, date(2024, 3, 13), dec!(80.00), "GROCERY STORE", "Card");
        let close = m.score_pair(&a, &same_day).unwrap();
        let far = m.score_pair(&a, &three_days_mismatch).unwrap();
        assert!(close.score >= far.score);
        assert_eq!(far.factors.date, 0.0);

        let mut previous = f64::INFINITY;
        for offset in 0..=3 {
            let b = txn(Side::B, 3, date(2024, 3, 10 + offset), dec!(80.00), "ONLINE PMT CARD", "Card");
            let s = m.score_pair(&a, &b).unwrap().score;
            assert!(s <= previous);
            previous = s;
        }
    }

    #[test]
    fn test_amount_epsilon_boundary() {
        let m = matcher();
        let a = txn(Side::A, 1, date(2024, 3, 1), dec!(-120.00), "AMEX PAYMENT", "Checking");
        let at_eps = txn(Side::B, 1, date(2024, 3, 1), dec!(120.01), "PAYMENT THANK YOU", "Amex");
        let past_eps = txn(Side::B, 2, date(2024, 3, 1), dec!(120.011), "PAYMENT THANK YOU", "Amex");

        let c = m.score_pair(&a, &at_eps).unwrap();
        assert_eq!(c.factors.amount_delta, dec!(0.01));
        assert_eq!(c.factors.amount, 0.5);
        assert!(m.score_pair(&a, &past_eps).is_none());

        let report = m.match_transactions(&a_vec(&a), &[at_eps.clone()]);
        assert_eq!(report.entries.len(), 1);
        let report = m.match_transactions(&a_vec(&a), &[past_eps]);
        assert!(report.entries.is_empty());
        assert!(report.decisions.is_empty());
    }

    fn a_vec(t: &Transaction) -> Vec<Transaction> {
        vec![t.clone()]
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let m = matcher();
        let a = txn(Side::A, 1, date(2024, 3, 1), dec!(-50.00), "PAYMENT", "Checking");
        let edge = txn(Side::B, 1, date(2024, 3, 4), dec!(50.00), "PAYMENT", "Card");
        let beyond = txn(Side::B, 2, date(2024, 3, 5), dec!(50.00), "PAYMENT", "Card");
        assert!(m.score_pair(&a, &edge).is_some());
        assert!(m.score_pair(&a, &beyond).is_none());
        let before = txn(Side::B, 3, date(2024, 2, 27), dec!(50.00), "PAYMENT", "Card");
        assert!(m.score_pair(&a, &before).is_some());
    }

    #[test]
    fn test_same_account_is_not_a_candidate() {
        let a = txn(Side::A, 1, date(2024, 3, 1), dec!(-50.00), "PAYMENT", "Checking");
        let b = txn(Side::B, 1, date(2024, 3, 1), dec!(50.00), "PAYMENT", "checking");
        assert!(matcher().score_pair(&a, &b).is_none());
    }

    #[test]
    fn test_smaller_date_delta_supersedes() {
        let a = vec![txn(Side::A, 1, date(2024, 3, 1), dec!(-120.00), "AMEX PAYMENT", "Checking")];
        let b = vec![
            txn(Side::B, 1, date(2024, 3, 3), dec!(120.00), "PAYMENT THANK YOU", "Amex"),
            txn(Side::B, 2, date(2024, 3, 2), dec!(120.00), "PAYMENT THANK YOU", "Amex"),
        ];
        let report = matcher().match_transactions(&a, &b);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].provenance.b, TransactionId::new(Side::B, 2));

        let superseded: Vec<_> = report
            .decisions
            .iter()
            .filter(|d| matches!(d.decision, Decision::Superseded { .. }))
            .collect();
        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].candidate.b, TransactionId::new(Side::B, 1));
        assert_eq!(
            superseded[0].decision,
            Decision::Superseded {
                by: (TransactionId::new(Side::A, 1), TransactionId::new(Side::B, 2))
            }
        );
    }

    #[test]
    fn test_exact_tie_broken_by_source_file() {
        let a = vec![txn(Side::A, 1, date(2024, 3, 2), dec!(-75.00), "CARD PAYMENT", "Checking")];
        let mut early = txn(Side::B, 1, date(2024, 3, 1), dec!(75.00), "CARD PAYMENT", "Card");
        early.source_file = "z_statement.csv".to_string();
        let mut late = txn(Side::B, 2, date(2024, 3, 3), dec!(75.00), "CARD PAYMENT", "Card");
        late.source_file = "a_statement.csv".to_string();

        let report = matcher().match_transactions(&a, &[early, late]);
        let scores: Vec<f64> = report.decisions.iter().map(|d| d.candidate.score).collect();
        assert_eq!(scores[0], scores[1]);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].provenance.b_source_file, "a_statement.csv");
    }

    #[test]
    fn test_no_transaction_matched_twice() {
        let a = vec![
            txn(Side::A, 1, date(2024, 3, 1), dec!(-100.00), "CARD PAYMENT", "Checking"),
            txn(Side::A, 2, date(2024, 3, 1), dec!(-100.00), "CARD PAYMENT", "Checking"),
            txn(Side::A, 3, date(2024, 3, 2), dec!(-100.00), "CARD PAYMENT", "Checking"),
        ];
        let b = vec![
            txn(Side::B, 1, date(2024, 3, 1), dec!(100.00), "PAYMENT RECEIVED", "Card"),
            txn(Side::B, 2, date(2024, 3, 2), dec!(100.00), "PAYMENT RECEIVED", "Card"),
        ];
        let report = matcher().match_transactions(&a, &b);
        assert_eq!(report.entries.len(), 2);
        let mut seen = std::collections::HashSet::new();
        for e in &report.entries {
            assert!(seen.insert(e.provenance.a));
            assert!(seen.insert(e.provenance.b));
        }
    }

    #[test]
    fn test_duplicates_are_distinct_entities() {
        let a = vec![
            txn(Side::A, 1, date(2024, 3, 1), dec!(-60.00), "CARD PAYMENT", "Checking"),
            txn(Side::A, 2, date(2024, 3, 1), dec!(-60.00), "CARD PAYMENT", "Checking"),
        ];
        let b = vec![
            txn(Side::B, 1, date(2024, 3, 1), dec!(60.00), "CARD PAYMENT", "Card"),
            txn(Side::B, 2, date(2024, 3, 1), dec!(60.00), "CARD PAYMENT", "Card"),
        ];
        let report = matcher().match_transactions(&a, &b);
        assert_eq!(report.entries.len(), 2);
    }

    #[test]
    fn test_below_threshold_rejected() {
        let a = vec![txn(Side::A, 1, date(2024, 3, 1), dec!(-42.00), "GROCERY", "Checking")];
        let b = vec![txn(Side::B, 1, date(2024, 3, 4), dec!(42.00), "HARDWARE", "Card")];
        let report = matcher().match_transactions(&a, &b);
        assert!(report.entries.is_empty());
        assert_eq!(report.decisions.len(), 1);
        assert_eq!(report.decisions[0].decision, Decision::BelowThreshold { threshold: 0.60 });
        assert_eq!(report.rejected_count(), 1);
    }

    #[test]
    fn test_no_matches_is_empty_not_error() {
        let report = matcher().match_transactions(&[], &[]);
        assert!(report.entries.is_empty());
        assert!(report.decisions.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let a = vec![
            txn(Side::A, 1, date(2024, 3, 1), dec!(-120.00), "AMEX PAYMENT", "Checking"),
            txn(Side::A, 2, date(2024, 3, 5), dec!(-310.45), "CHASE CREDIT CRD AUTOPAY", "Checking"),
        ];
        let b = vec![
            txn(Side::B, 1, date(2024, 3, 2), dec!(120.00), "PAYMENT THANK YOU", "Amex"),
            txn(Side::B, 2, date(2024, 3, 6), dec!(310.45), "AUTOMATIC PAYMENT", "Chase Sapphire"),
        ];
        let m = matcher();
        let first = m.match_transactions(&a, &b);
        let second = m.match_transactions(&a, &b);
        assert_eq!(first.entries, second.entries);
        assert_eq!(first.decisions, second.decisions);
        assert_eq!(first.entries.len(), 2);
    }

    #[test]
    fn test_shuffled_input_same_matches() {
        let a = vec![
            txn(Side::A, 1, date(2024, 3, 1), dec!(-120.00), "AMEX PAYMENT", "Checking"),
            txn(Side::A, 2, date(2024, 3, 1), dec!(-120.00), "CARD PAYMENT", "Checking"),
            txn(Side::A, 3, date(2024, 3, 8), dec!(-55.20), "CITI AUTOPAY", "Checking"),
        ];
        let b = vec![
            txn(Side::B, 1, date(2024, 3, 2), dec!(120.00), "PAYMENT THANK YOU", "Amex"),
            txn(Side::B, 2, date(2024, 3, 3), dec!(120.00), "PAYMENT THANK YOU", "Amex"),
            txn(Side::B, 3, date(2024, 3, 9), dec!(55.20), "PAYMENT RECEIVED", "Citi Card"),
        ];
        let m = matcher();
        let baseline = accepted_content(&m.match_transactions(&a, &b));

        let mut a_rev = a.clone();
        a_rev.reverse();
        let mut b_rot = b.clone();
        b_rot.rotate_left(1);
        assert_eq!(baseline, accepted_content(&m.match_transactions(&a_rev, &b_rot)));
        assert_eq!(baseline, accepted_content(&m.match_transactions(&a, &b_rot)));
        assert_eq!(baseline.len(), 3);
    }

    #[test]
    fn test_signs_pick_debit_and_credit() {
        // Both ledgers record the payment as negative: stream A pays.
        let a = vec![txn(Side::A, 1, date(2024, 3, 1), dec!(-200.00), "AMERICAN EXPRESS DES:ACH PMT", "Assets:Checking")];
        let b = vec![txn(
            Side::B,
            1,
            date(2024, 3, 1),
            dec!(-200.00),
            "ONLINE PAYMENT - THANK YOU",
            "Liabilities:CreditCards:AmericanExpress",
        )];
        let report = matcher().match_transactions(&a, &b);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].credit_account, "Assets:Checking");
        assert_eq!(report.entries[0].debit_account, "Liabilities:CreditCards:AmericanExpress");

        // Card ledger listed first as stream A with the inflow.
        let a = vec![txn(Side::A, 1, date(2024, 3, 1), dec!(200.00), "PAYMENT THANK YOU", "Amex")];
        let b = vec![txn(Side::B, 1, date(2024, 3, 1), dec!(-200.00), "AMEX PAYMENT", "Checking")];
        let report = matcher().match_transactions(&a, &b);
        assert_eq!(report.entries[0].credit_account, "Checking");
        assert_eq!(report.entries[0].debit_account, "Amex");
    }

    #[test]
    fn test_short_description_replaced_by_counterpart() {
        let a = vec![txn(Side::A, 1, date(2024, 3, 1), dec!(-90.00), "PMT", "Checking")];
        let b = vec![txn(Side::B, 1, date(2024, 3, 1), dec!(90.00), "ONLINE PAYMENT AMEX", "Amex")];
        let report = matcher().match_transactions(&a, &b);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].description, "ONLINE PAYMENT AMEX");
    }

    #[test]
    fn test_card_name_mismatch_scores_zero_hint() {
        let a = txn(Side::A, 1, date(2024, 3, 1), dec!(-90.00), "CHASE CREDIT CRD AUTOPAY", "Checking");
        let b = txn(Side::B, 1, date(2024, 3, 1), dec!(90.00), "PAYMENT THANK YOU", "Amex");
        let c = matcher().score_pair(&a, &b).unwrap();
        assert_eq!(c.factors.account_hint, 0.0);
        assert!(c.factors.reasons.iter().any(|r| r.contains("mismatch")));
    }

    #[test]
    fn test_source_file_correlation() {
        let mut a = txn(Side::A, 1, date(2024, 3, 1), dec!(-90.00), "AMEX PAYMENT", "Checking");
        let mut b = txn(Side::B, 1, date(2024, 3, 1), dec!(90.00), "PAYMENT THANK YOU", "Gold Card");
        a.source_file = "bank/checking_2024-03.csv".to_string();
        b.source_file = "cards/amex_2024-03.csv".to_string();
        let m = matcher();
        assert_eq!(m.score_pair(&a, &b).unwrap().factors.source_file, 1.0);

        b.source_file = "cards/card_2024-03.csv".to_string();
        assert_eq!(m.score_pair(&a, &b).unwrap().factors.source_file, 0.5);

        let mut overrides = HashMap::new();
        overrides.insert(crate::corrections::fingerprint("cards/card_2024-03.csv"), "American Express".to_string());
        let m = matcher().with_resolver(InstitutionResolver::new(overrides));
        assert_eq!(m.score_pair(&a, &b).unwrap().factors.source_file, 1.0);
    }

    #[test]
    fn test_custom_weights_normalized() {
        let cfg = MatchConfig {
            weights: ScoreWeights {
                amount: 2.0,
                date: 2.0,
                description: 0.0,
                account_hint: 0.0,
                source_file: 0.0,
            },
            ..MatchConfig::default()
        };
        let m = Matcher::new(cfg).unwrap();
        let a = txn(Side::A, 1, date(2024, 3, 1), dec!(-10.00), "X", "Checking");
        let b = txn(Side::B, 1, date(2024, 3, 1), dec!(10.00), "Y", "Card");
        assert_eq!(m.score_pair(&a, &b).unwrap().score, 1.0);
    }

    #[test]
    fn test_wide_date_window_near_calendar_edges() {
        let cfg = MatchConfig {
            date_window_days: crate::config::MAX_DATE_WINDOW_DAYS,
            ..MatchConfig::default()
        };
        let m = Matcher::new(cfg).unwrap();
        let a = vec![
            txn(Side::A, 1, NaiveDate::MIN, dec!(-10.00), "CARD PAYMENT", "Checking"),
            txn(Side::A, 2, NaiveDate::MAX, dec!(-10.00), "CARD PAYMENT", "Checking"),
        ];
        let b = vec![txn(Side::B, 1, date(2024, 3, 1), dec!(10.00), "CARD PAYMENT", "Card")];
        let report = m.match_transactions(&a, &b);
        assert!(report.decisions.is_empty());

        let unchecked = Matcher {
            config: MatchConfig {
                date_window_days: 200_000_000,
                ..MatchConfig::default()
            },
            resolver: InstitutionResolver::default(),
        };
        let report = unchecked.match_transactions(&a[..1], &b);
        assert_eq!(report.decisions.len(), 1);
    }

    #[test]
    fn test_non_finite_score_is_rejected() {
        let unchecked = Matcher {
            config: MatchConfig {
                min_confidence: 0.99,
                weights: ScoreWeights {
                    amount: 1e308,
                    date: 1e308,
                    description: 1e308,
                    account_hint: 1e308,
                    source_file: 1e308,
                },
                ..MatchConfig::default()
            },
            resolver: InstitutionResolver::default(),
        };
        let a = vec![txn(Side::A, 1, date(2024, 3, 1), dec!(-42.00), "GROCERY", "Checking")];
        let b = vec![txn(Side::B, 1, date(2024, 3, 1), dec!(42.00), "HARDWARE", "Card")];
        let report = unchecked.match_transactions(&a, &b);
        assert!(report.entries.is_empty());
        assert_eq!(report.decisions[0].decision, Decision::BelowThreshold { threshold: 0.99 });
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = MatchConfig {
            amount_epsilon: dec!(-1),
            ..MatchConfig::default()
        };
        assert!(Matcher::new(cfg).is_err());
    }

    #[test]
    fn test_match_streams_skips_malformed() {
        let raw = |row, d: Option<NaiveDate>, amount: Option<Decimal>, desc: &str, account: &str| RawTransaction {
            row,
            date: d,
            amount,
            description: desc.to_string(),
            account: account.to_string(),
            source_file: "in.csv".to_string(),
        };
        let a = vec![
            raw(1, None, Some(dec!(-5.00)), "NO DATE", "Checking"),
            raw(2, Some(date(2024, 3, 1)), Some(dec!(-120.00)), "AMEX PAYMENT", "Checking"),
        ];
        let b = vec![
            raw(1, Some(date(2024, 3, 2)), None, "NO AMOUNT", "Amex"),
            raw(2, Some(date(2024, 3, 2)), Some(dec!(120.00)), "PAYMENT THANK YOU", "Amex"),
        ];
        let report = match_streams(&a, &b, &matcher());
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[0].id, TransactionId::new(Side::A, 1));
        assert_eq!(report.warnings[1].id, TransactionId::new(Side::B, 1));
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].provenance.a, TransactionId::new(Side::A, 2));
    }
}
