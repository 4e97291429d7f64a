//! Institution and card-name inference from free text, plus description
//! tokenization used by the matcher's scoring.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use crate::corrections::fingerprint;

// (canonical name, aliases). Aliases are compared as whole words after normalization.
const KNOWN_INSTITUTIONS: &[(&str, &[&str])] = &[
    ("American Express", &["AMERICAN EXPRESS", "AMERICANEXPRESS", "AMEX"]),
    ("Bank of America", &["BANK OF AMERICA", "BANKOFAMERICA", "BOFA", "BKOFAMERICA"]),
    ("Chase", &["CHASE", "JPMORGAN CHASE"]),
    ("Citi", &["CITI", "CITIBANK", "CITICARDS"]),
    ("Discover", &["DISCOVER"]),
    ("Capital One", &["CAPITAL ONE", "CAPITALONE", "CAP ONE"]),
    ("Wells Fargo", &["WELLS FARGO", "WELLSFARGO"]),
    ("US Bank", &["US BANK", "USBANK", "U S BANK"]),
    ("Barclays", &["BARCLAYS", "BARCLAYCARD"]),
    ("Synchrony", &["SYNCHRONY", "SYNCB"]),
    ("Apple Card", &["APPLE CARD", "APPLECARD", "GS BANK"]),
    ("PNC", &["PNC"]),
    ("USAA", &["USAA"]),
    ("Navy Federal", &["NAVY FEDERAL", "NAVY FCU", "NFCU"]),
];

const PAYMENT_KEYWORDS: &[&str] = &["PAYMENT", "PMT", "PYMT", "AUTOPAY", "EPAY"];

// Bank export noise that carries no identity.
const STOPWORDS: &[&str] = &[
    "DES", "ID", "INDN", "CO", "WEB", "PPD", "CCD", "ACH", "THE", "TO", "FROM", "FOR", "OF",
];

/// Uppercase, split camel case, and collapse every non-alphanumeric run to a space.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if prev.is_some_and(|p| p.is_lowercase()) && c.is_uppercase() {
                out.push(' ');
            }
            out.extend(c.to_uppercase());
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
        prev = Some(c);
    }
    out.trim().to_string()
}

fn word_position(haystack: &str, needle: &str) -> Option<usize> {
    let padded = format!(" {haystack} ");
    padded.find(&format!(" {needle} "))
}

/// The known institution mentioned earliest in `text`, if any.
pub fn institution_in_text(text: &str) -> Option<&'static str> {
    let norm = normalize(text);
    if norm.is_empty() {
        return None;
    }
    KNOWN_INSTITUTIONS
        .iter()
        .filter_map(|(name, aliases)| {
            aliases
                .iter()
                .filter_map(|alias| word_position(&norm, alias))
                .min()
                .map(|pos| (pos, *name))
        })
        .min()
        .map(|(_, name)| name)
}

pub fn tokens(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split(' ')
        .filter(|t| t.len() >= 2)
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Jaccard overlap of description tokens.
pub fn description_similarity(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    shared as f64 / union as f64
}

pub fn is_payment(text: &str) -> bool {
    let norm = normalize(text);
    PAYMENT_KEYWORDS
        .iter()
        .any(|kw| word_position(&norm, kw).is_some())
        || word_position(&norm, "AUTO PAY").is_some()
}

fn period_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9])((?:19|20)\d{2})[-_]?(0[1-9]|1[0-2])(?:[^0-9]|$)").ok()
    })
    .as_ref()
}

/// Statement period (year, month) embedded in a file path, e.g. `stmt_2024-03.pdf`.
pub fn statement_period(path: &str) -> Option<(i32, u32)> {
    let caps = period_regex()?.captures(path)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    Some((year, month))
}

/// Resolves which institution a transaction's source file belongs to. User
/// corrections, keyed by path fingerprint, win over text inference.
#[derive(Debug, Clone, Default)]
pub struct InstitutionResolver {
    overrides: HashMap<String, String>,
}

impl InstitutionResolver {
    pub fn new(overrides: HashMap<String, String>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(fp, name)| {
                let canonical = canonical_name(&name);
                (fp, canonical)
            })
            .collect();
        Self { overrides }
    }

    pub fn source_institution(&self, source_file: &str) -> Option<String> {
        if let Some(name) = self.overrides.get(&fingerprint(source_file)) {
            return Some(name.clone());
        }
        institution_in_text(source_file).map(str::to_string)
    }
}

/// Known canonical name for a user-supplied institution, or the input trimmed.
pub fn canonical_name(name: &str) -> String {
    institution_in_text(name)
        .map(str::to_string)
        .unwrap_or_else(|| name.trim().to_string())
}
