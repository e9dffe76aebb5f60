use thiserror::Error;

/// Fatal parse failures. Per-transaction problems are warnings, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfxError {
    #[error("Failed to parse OFX: {0}")]
    Format(String),
    #[error("Missing required field: ACCTID")]
    MissingAccount,
    #[error("No valid transactions found in statement")]
    NoTransactions,
}
