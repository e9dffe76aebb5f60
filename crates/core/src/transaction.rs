use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::money::Money;

/// A `<STMTTRN>` block as it is being read. Every field is optional until the
/// closing marker is seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionDraft {
    pub id: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub amount: Option<Money>,
    pub memo: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub check_number: Option<String>,
    pub reference_number: Option<String>,
    /// Field values that were present but could not be parsed.
    pub problems: Vec<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl TransactionDraft {
    /// Memo wins over name; name is only a fallback.
    pub fn description(&self) -> Option<&str> {
        non_empty(&self.memo).or_else(|| non_empty(&self.name))
    }

    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if non_empty(&self.id).is_none() {
            missing.push("FITID");
        }
        if self.date.is_none() {
            missing.push("DTPOSTED");
        }
        if self.amount.is_none() {
            missing.push("TRNAMT");
        }
        if self.description().is_none() {
            missing.push("MEMO/NAME");
        }
        if non_empty(&self.kind).is_none() {
            missing.push("TRNTYPE");
        }
        missing
    }

    pub fn validate(self) -> Result<RawTransaction, InvalidTransaction> {
        let missing = self.missing_fields();
        let description = self.description().map(str::to_string);

        match (self.id, self.date, self.amount, description, self.kind) {
            (Some(id), Some(date), Some(amount), Some(description), Some(kind))
                if missing.is_empty() =>
            {
                Ok(RawTransaction {
                    id,
                    date,
                    amount,
                    description,
                    kind,
                    memo: self.memo.filter(|m| !m.trim().is_empty()),
                    check_number: self.check_number,
                    reference_number: self.reference_number,
                })
            }
            (id, ..) => Err(InvalidTransaction {
                id,
                missing,
                problems: self.problems,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub id: String,
    pub date: NaiveDateTime,
    pub amount: Money,
    pub description: String,
    pub kind: String,
    pub memo: Option<String>,
    pub check_number: Option<String>,
    pub reference_number: Option<String>,
}

impl RawTransaction {
    /// Back to draft form; used to re-check finished records.
    pub fn to_draft(&self) -> TransactionDraft {
        TransactionDraft {
            id: Some(self.id.clone()),
            date: Some(self.date),
            amount: Some(self.amount),
            memo: self.memo.clone(),
            name: Some(self.description.clone()),
            kind: Some(self.kind.clone()),
            check_number: self.check_number.clone(),
            reference_number: self.reference_number.clone(),
            problems: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}", describe(.id, .missing, .problems))]
pub struct InvalidTransaction {
    pub id: Option<String>,
    pub missing: Vec<&'static str>,
    pub problems: Vec<String>,
}

fn describe(id: &Option<String>, missing: &[&'static str], problems: &[String]) -> String {
    let who = match id.as_deref().filter(|v| !v.trim().is_empty()) {
        Some(id) => format!("transaction {id}"),
        None => "transaction without FITID".to_string(),
    };
    let mut reasons: Vec<String> = problems.to_vec();
    if !missing.is_empty() {
        reasons.push(format!("missing {}", missing.join(", ")));
    }
    format!("{who} skipped: {}", reasons.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn complete() -> TransactionDraft {
        TransactionDraft {
            id: Some("TXN001".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0),
            amount: Some(Money::from_cents(-4999)),
            memo: Some("Online purchase".to_string()),
            name: Some("AMAZON MARKETPLACE".to_string()),
            kind: Some("DEBIT".to_string()),
            ..TransactionDraft::default()
        }
    }

    #[test]
    fn complete_draft_is_valid() {
        assert!(complete().is_valid());
        let tx = complete().validate().unwrap();
        assert_eq!(tx.id, "TXN001");
        assert_eq!(tx.description, "Online purchase");
        assert_eq!(tx.memo.as_deref(), Some("Online purchase"));
    }

    #[test]
    fn zero_amount_is_valid() {
        let draft = TransactionDraft {
            amount: Some(Money::zero()),
            ..complete()
        };
        assert!(draft.is_valid());
    }

    #[test]
    fn missing_amount_is_invalid() {
        let draft = TransactionDraft {
            amount: None,
            ..complete()
        };
        assert!(!draft.is_valid());
        assert_eq!(draft.missing_fields(), vec!["TRNAMT"]);
    }

    #[test]
    fn name_is_fallback_description() {
        let draft = TransactionDraft {
            memo: None,
            ..complete()
        };
        assert_eq!(draft.description(), Some("AMAZON MARKETPLACE"));

        let blank_memo = TransactionDraft {
            memo: Some("  ".to_string()),
            ..complete()
        };
        let tx = blank_memo.validate().unwrap();
        assert_eq!(tx.description, "AMAZON MARKETPLACE");
        assert!(tx.memo.is_none());
    }

    #[test]
    fn empty_draft_lists_every_field() {
        let draft = TransactionDraft::default();
        assert!(!draft.is_valid());
        assert_eq!(
            draft.missing_fields(),
            vec!["FITID", "DTPOSTED", "TRNAMT", "MEMO/NAME", "TRNTYPE"]
        );
    }

    #[test]
    fn blank_kind_is_invalid() {
        let draft = TransactionDraft {
            kind: Some(String::new()),
            ..complete()
        };
        let err = draft.validate().unwrap_err();
        assert_eq!(err.missing, vec!["TRNTYPE"]);
        assert_eq!(err.to_string(), "transaction TXN001 skipped: missing TRNTYPE");
    }

    #[test]
    fn error_message_includes_problems() {
        let draft = TransactionDraft {
            id: None,
            date: None,
            problems: vec!["invalid DTPOSTED '2024'".to_string()],
            ..complete()
        };
        let err = draft.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "transaction without FITID skipped: invalid DTPOSTED '2024'; missing FITID, DTPOSTED"
        );
    }

    #[test]
    fn finished_transaction_round_trips_through_validator() {
        let tx = complete().validate().unwrap();
        assert!(tx.to_draft().is_valid());
    }

    #[test]
    fn raw_transaction_serializes_amount_as_string() {
        let tx = complete().validate().unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["amount"], "-49.99");
        assert_eq!(json["date"], "2024-01-15T00:00:00");
    }
}
