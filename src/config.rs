use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Widest accepted date window: one hundred years.
pub const MAX_DATE_WINDOW_DAYS: i64 = 36_500;

/// Relative weight of each scoring factor. Scores are normalized by the sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub amount: f64,
    pub date: f64,
    pub description: f64,
    pub account_hint: f64,
    pub source_file: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            amount: 0.35,
            date: 0.25,
            description: 0.15,
            account_hint: 0.15,
            source_file: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.amount + self.date + self.description + self.account_hint + self.source_file
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("amount", self.amount),
            ("date", self.date),
            ("description", self.description),
            ("account_hint", self.account_hint),
            ("source_file", self.source_file),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub amount_epsilon: Decimal,
    pub date_window_days: i64,
    pub min_confidence: f64,
    pub weights: ScoreWeights,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            amount_epsilon: Decimal::new(1, 2),
            date_window_days: 3,
            min_confidence: 0.60,
            weights: ScoreWeights::default(),
        }
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub amount_epsilon: Option<Decimal>,
    pub date_window_days: Option<i64>,
    pub min_confidence: Option<f64>,
}

impl MatchConfig {
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(eps) = overrides.amount_epsilon {
            self.amount_epsilon = eps;
        }
        if let Some(days) = overrides.date_window_days {
            self.date_window_days = days;
        }
        if let Some(min) = overrides.min_confidence {
            self.min_confidence = min;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount_epsilon < Decimal::ZERO {
            return Err(LedgerError::InvalidConfig(format!(
                "amount_epsilon must be >= 0 (got {})",
                self.amount_epsilon
            )));
        }
        if !(0..=MAX_DATE_WINDOW_DAYS).contains(&self.date_window_days) {
            return Err(LedgerError::InvalidConfig(format!(
                "date_window_days must be between 0 and {MAX_DATE_WINDOW_DAYS} (got {})",
                self.date_window_days
            )));
        }
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(LedgerError::InvalidConfig(format!(
                "min_confidence must be between 0 and 1 (got {})",
                self.min_confidence
            )));
        }
        for (name, weight) in self.weights.named() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(LedgerError::InvalidConfig(format!(
                    "weights.{name} must be a non-negative number (got {weight})"
                )));
            }
        }
        let total = self.weights.total();
        if !total.is_finite() {
            return Err(LedgerError::InvalidConfig(format!(
                "sum of scoring weights must be finite (got {total})"
            )));
        }
        if total <= 0.0 {
            return Err(LedgerError::InvalidConfig(
                "at least one scoring weight must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
