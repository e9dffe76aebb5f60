use std::collections::HashSet;

use chrono::NaiveDateTime;
use razao_core::{Money, RawTransaction};

use crate::hash::sha256_hex;

/// Identity of an economic event within one statement: exact date, amount
/// and description. Not fuzzy; a one-cent or trailing-space difference makes
/// two transactions distinct, and two genuine identical purchases on the same
/// timestamp collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub date: NaiveDateTime,
    pub amount: Money,
    pub description: String,
}

impl DuplicateKey {
    pub fn of(tx: &RawTransaction) -> Self {
        DuplicateKey {
            date: tx.date,
            amount: tx.amount,
            description: tx.description.clone(),
        }
    }

    /// `ISO timestamp|amount|description`.
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}",
            self.date.format("%Y-%m-%dT%H:%M:%S%.3f"),
            self.amount.canonical(),
            self.description
        )
    }
}

#[derive(Debug, Clone)]
pub struct Deduplicated {
    pub transactions: Vec<RawTransaction>,
    pub duplicates_removed: usize,
}

/// Keep the first occurrence of each key, preserving input order.
pub fn dedupe(transactions: Vec<RawTransaction>) -> Deduplicated {
    let before = transactions.len();
    let mut seen = HashSet::with_capacity(before);

    let kept: Vec<RawTransaction> = transactions
        .into_iter()
        .filter(|tx| seen.insert(DuplicateKey::of(tx)))
        .collect();

    let duplicates_removed = before - kept.len();
    if duplicates_removed > 0 {
        tracing::debug!(duplicates_removed, "dropped duplicate transactions");
    }

    Deduplicated {
        transactions: kept,
        duplicates_removed,
    }
}

/// Stable hex digest of a transaction's duplicate key, for duplicate checks
/// against records already stored elsewhere.
pub fn fingerprint(tx: &RawTransaction) -> String {
    sha256_hex(DuplicateKey::of(tx).canonical().as_bytes())
}
