use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::range::DateRange;
use super::transaction::RawTransaction;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub account_id: String,
    pub bank_id: String,
    pub account_type: String,
    /// `<BRANCHID>`; the agency/routing code when the bank sends one.
    pub routing_number: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub amount: Option<Money>,
    pub as_of: Option<NaiveDateTime>,
}

impl BalanceInfo {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.as_of.is_none()
    }
}

/// A scanned statement. Transactions are ordered newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub account: AccountMetadata,
    pub balance: Option<BalanceInfo>,
    pub currency: Option<String>,
    pub period: Option<DateRange>,
    pub transactions: Vec<RawTransaction>,
}

impl ParsedDocument {
    /// Stable sort, newest first; equal timestamps keep file order.
    pub fn sort_newest_first(&mut self) {
        self.transactions.sort_by(|a, b| b.date.cmp(&a.date));
    }

    pub fn is_sorted_newest_first(&self) -> bool {
        self.transactions.windows(2).all(|w| w[0].date >= w[1].date)
    }
}
