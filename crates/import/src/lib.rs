pub mod categorize;
pub mod dedupe;
pub mod error;
pub mod hash;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod scanner;

pub use categorize::{Category, CategoryRule, Categorizer, RuleError};
pub use dedupe::{Deduplicated, DuplicateKey};
pub use error::OfxError;
pub use pipeline::{ImportError, ImportOutcome, StatementImporter};
pub use report::{ImportReport, ReportError};
pub use scanner::Scan;

pub mod import {
    use crate::*;

    /// Run the full pipeline with the built-in category rules.
    pub fn import_ofx(data: &[u8]) -> Result<ImportOutcome, ImportError> {
        StatementImporter::default().process_bytes(data)
    }

    pub fn sanitize_ofx(raw: &str) -> Result<String, OfxError> {
        crate::preprocess::sanitize(raw)
    }

    pub fn scan_ofx(raw: &str) -> Result<Scan, OfxError> {
        let sanitized = crate::preprocess::sanitize(raw)?;
        crate::scanner::scan(&sanitized)
    }

    pub fn create_categorizer(rules: Vec<CategoryRule>) -> Categorizer {
        Categorizer::new(rules)
    }
}
