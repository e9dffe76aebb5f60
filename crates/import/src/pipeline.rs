use std::borrow::Cow;

use razao_core::ParsedDocument;
use serde::Serialize;
use thiserror::Error;

use crate::categorize::Categorizer;
use crate::dedupe;
use crate::error::OfxError;
use crate::hash;
use crate::preprocess;
use crate::report::{self, ImportReport, ReportError};
use crate::scanner;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error(transparent)]
    Ofx(#[from] OfxError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// The result of a single statement import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// SHA-256 hex digest of the raw input bytes.
    pub source_sha256: String,
    /// Scanned statement with duplicates already removed.
    pub document: ParsedDocument,
    pub report: ImportReport,
    /// Per-transaction problems that did not abort the import.
    pub warnings: Vec<String>,
}

/// Orchestrates: hash → decode → sanitize → scan → dedupe → report.
#[derive(Debug, Clone, Default)]
pub struct StatementImporter {
    categorizer: Categorizer,
}

impl StatementImporter {
    pub fn new(categorizer: Categorizer) -> Self {
        Self { categorizer }
    }

    /// Process raw file bytes.
    pub fn process_bytes(&self, data: &[u8]) -> Result<ImportOutcome, ImportError> {
        let source_sha256 = hash::sha256_hex(data);
        let text = decode_text(data);
        self.run(source_sha256, &text)
    }

    /// Process already-decoded text.
    pub fn process_str(&self, text: &str) -> Result<ImportOutcome, ImportError> {
        let source_sha256 = hash::sha256_hex(text.as_bytes());
        self.run(source_sha256, text)
    }

    fn run(&self, source_sha256: String, text: &str) -> Result<ImportOutcome, ImportError> {
        let sanitized = preprocess::sanitize(text)?;
        tracing::debug!(bytes = sanitized.len(), "sanitized statement");

        let scanner::Scan {
            mut document,
            warnings,
        } = scanner::scan(&sanitized)?;

        let deduped = dedupe::dedupe(std::mem::take(&mut document.transactions));
        document.transactions = deduped.transactions;

        let report = report::build_report_with(&document.transactions, &self.categorizer)?
            .with_duplicates_removed(deduped.duplicates_removed);

        tracing::info!(
            account = %document.account.account_id,
            transactions = report.total_transactions,
            duplicates_removed = report.duplicates_removed,
            warnings = warnings.len(),
            "statement imported"
        );

        Ok(ImportOutcome {
            source_sha256,
            document,
            report,
            warnings,
        })
    }
}

/// UTF-8 when valid; otherwise Windows-1252, the `CHARSET:1252` most
/// Brazilian banks declare.
pub fn decode_text(data: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text.trim_start_matches('\u{feff}')),
        Err(_) => Cow::Owned(data.iter().map(|&b| cp1252_char(b)).collect()),
    }
}

// 0x80..=0x9F; the five unassigned bytes map to their C1 controls.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn cp1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}
