use std::collections::BTreeMap;

use razao_core::{AmountRange, DateRange, RawTransaction};
use serde::Serialize;
use thiserror::Error;

use crate::categorize::{Category, Categorizer};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Cannot build a report from zero transactions")]
    EmptyInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub total_transactions: usize,
    /// Filled in by the caller that ran deduplication.
    pub duplicates_removed: usize,
    pub date_range: DateRange,
    pub amount_range: AmountRange,
    pub categories: BTreeMap<Category, usize>,
}

impl ImportReport {
    pub fn with_duplicates_removed(mut self, count: usize) -> Self {
        self.duplicates_removed = count;
        self
    }
}

pub fn build_report(transactions: &[RawTransaction]) -> Result<ImportReport, ReportError> {
    build_report_with(transactions, &Categorizer::default())
}

pub fn build_report_with(
    transactions: &[RawTransaction],
    categorizer: &Categorizer,
) -> Result<ImportReport, ReportError> {
    let date_range =
        DateRange::spanning(transactions.iter().map(|t| t.date)).ok_or(ReportError::EmptyInput)?;
    let amount_range = AmountRange::spanning(transactions.iter().map(|t| t.amount))
        .ok_or(ReportError::EmptyInput)?;

    let mut categories = BTreeMap::new();
    for tx in transactions {
        *categories
            .entry(categorizer.categorize(&tx.description))
            .or_insert(0) += 1;
    }

    Ok(ImportReport {
        total_transactions: transactions.len(),
        duplicates_removed: 0,
        date_range,
        amount_range,
        categories,
    })
}
