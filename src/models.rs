use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Which of the two input streams a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stream side plus 1-based row position in that stream's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId {
    pub side: Side,
    pub row: usize,
}

impl TransactionId {
    pub fn new(side: Side, row: usize) -> Self {
        Self { side, row }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.side, self.row)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub account: String,
    pub source_file: String,
}

/// A row as read from a stream file, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTransaction {
    pub row: usize,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub description: String,
    pub account: String,
    pub source_file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    MissingDate,
    MissingAmount,
    MissingAccount,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingDate => "missing or unparseable date",
            Self::MissingAmount => "missing or unparseable amount",
            Self::MissingAccount => "missing account",
        })
    }
}

/// A record excluded from matching.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedRecord {
    pub id: TransactionId,
    pub source_file: String,
    pub reason: MalformedReason,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.id, self.source_file, self.reason)
    }
}

impl RawTransaction {
    pub fn validate(&self, side: Side) -> std::result::Result<Transaction, MalformedRecord> {
        let id = TransactionId::new(side, self.row);
        let malformed = |reason| MalformedRecord {
            id,
            source_file: self.source_file.clone(),
            reason,
        };
        let date = self.date.ok_or_else(|| malformed(MalformedReason::MissingDate))?;
        let amount = self.amount.ok_or_else(|| malformed(MalformedReason::MissingAmount))?;
        let account = self.account.trim();
        if account.is_empty() {
            return Err(malformed(MalformedReason::MissingAccount));
        }
        Ok(Transaction {
            id,
            date,
            amount,
            description: self.description.trim().to_string(),
            account: account.to_string(),
            source_file: self.source_file.clone(),
        })
    }
}

/// Per-factor values (each in [0,1]) behind a candidate's score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub amount_delta: Decimal,
    pub date_delta_days: i64,
    pub amount: f64,
    pub date: f64,
    pub description: f64,
    pub account_hint: f64,
    pub source_file: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub a: TransactionId,
    pub b: TransactionId,
    pub score: f64,
    pub factors: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Accepted,
    BelowThreshold { threshold: f64 },
    Superseded { by: (TransactionId, TransactionId) },
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub candidate: MatchCandidate,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub a: TransactionId,
    pub b: TransactionId,
    pub a_source_file: String,
    pub b_source_file: String,
    /// Stream whose account is credited.
    pub credit_side: Side,
    pub reasons: Vec<String>,
}

impl Provenance {
    pub fn credit_source_file(&self) -> &str {
        match self.credit_side {
            Side::A => &self.a_source_file,
            Side::B => &self.b_source_file,
        }
    }

    pub fn debit_source_file(&self) -> &str {
        match self.credit_side {
            Side::A => &self.b_source_file,
            Side::B => &self.a_source_file,
        }
    }
}

/// Double-entry record replacing a matched pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedEntry {
    pub date: NaiveDate,
    pub description: String,
    pub debit_account: String,
    pub credit_account: String,
    pub amount: Decimal,
    pub confidence: f64,
    pub provenance: Provenance,
}
