pub mod money;
pub mod range;
pub mod statement;
pub mod transaction;

pub use money::Money;
pub use range::{AmountRange, DateRange};
pub use statement::{AccountMetadata, BalanceInfo, ParsedDocument};
pub use transaction::{InvalidTransaction, RawTransaction, TransactionDraft};
