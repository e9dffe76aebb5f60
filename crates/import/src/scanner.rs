use chrono::{NaiveDate, NaiveDateTime};
use razao_core::{
    AccountMetadata, BalanceInfo, DateRange, Money, ParsedDocument, RawTransaction,
    TransactionDraft,
};

use crate::error::OfxError;

const TRANSACTION_MARKER: &str = "STMTTRN";
const ACCOUNT_SECTIONS: [&str; 2] = ["BANKACCTFROM", "CCACCTFROM"];

/// One `<TAG>value` pair read from a logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldToken {
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Open(String),
    Close(String),
    Field(FieldToken),
    Ignored,
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// `<TAG>value</TAG>` first, then `<TAG>value` up to the next tag or end of line.
fn field_value(tag: &str, rest: &str) -> String {
    let closing = format!("</{tag}>");
    let upper = rest.to_ascii_uppercase();
    let raw = match upper.find(&closing) {
        Some(end) => &rest[..end],
        None => rest.split('<').next().unwrap_or_default(),
    };
    decode_entities(raw.trim())
}

fn classify(line: &str) -> Line {
    let Some(rest) = line.trim().strip_prefix('<') else {
        return Line::Ignored;
    };
    let Some((name, rest)) = rest.split_once('>') else {
        return Line::Ignored;
    };
    if let Some(closing) = name.trim().strip_prefix('/') {
        return Line::Close(closing.trim().to_ascii_uppercase());
    }
    let tag = name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    let value = field_value(&tag, rest);
    if value.is_empty() {
        Line::Open(tag)
    } else {
        Line::Field(FieldToken { tag, value })
    }
}

// ── Field tables ──────────────────────────────────────────────────────────────

type Setter<T> = fn(&mut T, &str) -> Result<(), OfxError>;

fn apply<T>(table: &[(&str, Setter<T>)], target: &mut T, token: &FieldToken) -> Result<(), OfxError> {
    match table.iter().find(|(tag, _)| *tag == token.tag) {
        Some((_, set)) => set(target, token.value.as_str()),
        None => Ok(()),
    }
}

/// Setter for plain text fields that take any value.
type Assign<T> = fn(&mut T, &str);

fn assign<T>(table: &[(&str, Assign<T>)], target: &mut T, token: &FieldToken) {
    if let Some((_, set)) = table.iter().find(|(tag, _)| *tag == token.tag) {
        set(target, token.value.as_str());
    }
}

const ACCOUNT_FIELDS: &[(&str, Assign<AccountMetadata>)] = &[
    ("ACCTID", set_account_id),
    ("BANKID", set_bank_id),
    ("ACCTTYPE", set_account_type),
    ("BRANCHID", set_routing_number),
];

const STATEMENT_FIELDS: &[(&str, Setter<ScanOutput>)] = &[
    ("BALAMT", set_balance_amount),
    ("DTASOF", set_balance_as_of),
    ("CURDEF", set_currency),
    ("DTSTART", set_period_start),
    ("DTEND", set_period_end),
];

const TRANSACTION_FIELDS: &[(&str, Setter<TransactionDraft>)] = &[
    ("TRNAMT", set_amount),
    ("DTPOSTED", set_posted),
    ("FITID", set_fit_id),
    ("MEMO", set_memo),
    ("NAME", set_name),
    ("TRNTYPE", set_kind),
    ("CHECKNUM", set_check_number),
    ("REFNUM", set_reference_number),
];

fn set_account_id(a: &mut AccountMetadata, v: &str) {
    a.account_id = v.to_string();
}

fn set_bank_id(a: &mut AccountMetadata, v: &str) {
    a.bank_id = v.to_string();
}

fn set_account_type(a: &mut AccountMetadata, v: &str) {
    a.account_type = v.to_string();
}

fn set_routing_number(a: &mut AccountMetadata, v: &str) {
    a.routing_number = Some(v.to_string());
}

// Ledger balance comes before available balance; the first one wins.
fn set_balance_amount(out: &mut ScanOutput, v: &str) -> Result<(), OfxError> {
    if out.balance.amount.is_none() {
        out.balance.amount = Some(parse_ofx_amount(v)?);
    }
    Ok(())
}

fn set_balance_as_of(out: &mut ScanOutput, v: &str) -> Result<(), OfxError> {
    if out.balance.as_of.is_none() {
        out.balance.as_of = Some(parse_ofx_datetime(v)?);
    }
    Ok(())
}

fn set_currency(out: &mut ScanOutput, v: &str) -> Result<(), OfxError> {
    out.currency = Some(v.to_string());
    Ok(())
}

fn set_period_start(out: &mut ScanOutput, v: &str) -> Result<(), OfxError> {
    out.period_start = Some(parse_ofx_datetime(v)?);
    Ok(())
}

fn set_period_end(out: &mut ScanOutput, v: &str) -> Result<(), OfxError> {
    out.period_end = Some(parse_ofx_datetime(v)?);
    Ok(())
}

fn set_amount(t: &mut TransactionDraft, v: &str) -> Result<(), OfxError> {
    t.amount = Some(parse_ofx_amount(v)?);
    Ok(())
}

fn set_posted(t: &mut TransactionDraft, v: &str) -> Result<(), OfxError> {
    t.date = Some(parse_ofx_datetime(v)?);
    Ok(())
}

fn set_fit_id(t: &mut TransactionDraft, v: &str) -> Result<(), OfxError> {
    t.id = Some(v.to_string());
    Ok(())
}

fn set_memo(t: &mut TransactionDraft, v: &str) -> Result<(), OfxError> {
    t.memo = Some(v.to_string());
    Ok(())
}

fn set_name(t: &mut TransactionDraft, v: &str) -> Result<(), OfxError> {
    t.name = Some(v.to_string());
    Ok(())
}

fn set_kind(t: &mut TransactionDraft, v: &str) -> Result<(), OfxError> {
    t.kind = Some(v.to_string());
    Ok(())
}

fn set_check_number(t: &mut TransactionDraft, v: &str) -> Result<(), OfxError> {
    t.check_number = Some(v.to_string());
    Ok(())
}

fn set_reference_number(t: &mut TransactionDraft, v: &str) -> Result<(), OfxError> {
    t.reference_number = Some(v.to_string());
    Ok(())
}

// ── Value parsing ─────────────────────────────────────────────────────────────

/// `YYYYMMDD[HHMMSS[.XXX]][tz]`. The bracketed zone and fractional seconds
/// are dropped; the result is local wall-clock time.
pub fn parse_ofx_datetime(raw: &str) -> Result<NaiveDateTime, OfxError> {
    let invalid = |why: &str| OfxError::Format(format!("date '{raw}' {why}"));

    let head = raw.split('[').next().unwrap_or_default();
    let head = head.split('.').next().unwrap_or_default();
    let digits: String = head.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 8 {
        return Err(invalid("has fewer than 8 digits"));
    }

    let num = |from: usize, to: usize| -> Result<u32, OfxError> {
        digits[from..to]
            .parse::<u32>()
            .map_err(|_| invalid("is not numeric"))
    };
    let (year, month, day) = (num(0, 4)?, num(4, 6)?, num(6, 8)?);
    let (hour, minute, second) = if digits.len() >= 14 {
        (num(8, 10)?, num(10, 12)?, num(12, 14)?)
    } else {
        (0, 0, 0)
    };

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| invalid("is not a calendar date"))
}

fn parse_ofx_amount(raw: &str) -> Result<Money, OfxError> {
    raw.parse::<Money>()
        .map_err(|e| OfxError::Format(e.to_string()))
}

// ── State machine ─────────────────────────────────────────────────────────────

/// Everything collected so far; threaded through every transition.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub account: AccountMetadata,
    pub balance: BalanceInfo,
    pub currency: Option<String>,
    pub period_start: Option<NaiveDateTime>,
    pub period_end: Option<NaiveDateTime>,
    pub transactions: Vec<RawTransaction>,
    pub warnings: Vec<String>,
    blocks_seen: usize,
}

impl ScanOutput {
    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    fn finish(&mut self, draft: TransactionDraft) {
        self.blocks_seen += 1;
        match draft.validate() {
            Ok(tx) => self.transactions.push(tx),
            Err(invalid) => self.warn(format!("STMTTRN #{}: {invalid}", self.blocks_seen)),
        }
    }

    fn discard(&mut self, draft: TransactionDraft, reason: &str) {
        self.blocks_seen += 1;
        let who = draft.id.as_deref().unwrap_or("without FITID");
        self.warn(format!(
            "STMTTRN #{}: transaction {who} dropped: {reason}",
            self.blocks_seen
        ));
    }

    fn into_scan(self) -> Result<Scan, OfxError> {
        if self.account.account_id.trim().is_empty() {
            return Err(OfxError::MissingAccount);
        }
        if self.transactions.is_empty() {
            return Err(OfxError::NoTransactions);
        }

        let period = match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        };
        let balance = (!self.balance.is_empty()).then_some(self.balance);

        let mut document = ParsedDocument {
            account: self.account,
            balance,
            currency: self.currency,
            period,
            transactions: self.transactions,
        };
        document.sort_newest_first();

        Ok(Scan {
            document,
            warnings: self.warnings,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    InAccountSection,
    InTransaction(TransactionDraft),
}

fn is_account_section(tag: &str) -> bool {
    ACCOUNT_SECTIONS.contains(&tag)
}

impl ScanState {
    /// Consume one logical line and return the next state.
    pub fn step(self, line: &str, out: &mut ScanOutput) -> ScanState {
        match (self, classify(line)) {
            (ScanState::InTransaction(draft), Line::Open(tag)) if tag == TRANSACTION_MARKER => {
                out.discard(draft, "not closed before the next <STMTTRN>");
                ScanState::InTransaction(TransactionDraft::default())
            }
            (_, Line::Open(tag)) if tag == TRANSACTION_MARKER => {
                ScanState::InTransaction(TransactionDraft::default())
            }
            (ScanState::InTransaction(draft), Line::Close(tag)) if tag == TRANSACTION_MARKER => {
                out.finish(draft);
                ScanState::Idle
            }
            (ScanState::InTransaction(mut draft), Line::Field(token)) => {
                if let Err(e) = apply(TRANSACTION_FIELDS, &mut draft, &token) {
                    draft.problems.push(format!("invalid {}: {e}", token.tag));
                }
                ScanState::InTransaction(draft)
            }
            (ScanState::Idle, Line::Open(tag)) if is_account_section(&tag) => {
                ScanState::InAccountSection
            }
            (ScanState::InAccountSection, Line::Close(tag)) if is_account_section(&tag) => {
                ScanState::Idle
            }
            (ScanState::InAccountSection, Line::Field(token)) => {
                assign(ACCOUNT_FIELDS, &mut out.account, &token);
                ScanState::InAccountSection
            }
            (ScanState::Idle, Line::Field(token)) => {
                if let Err(e) = apply(STATEMENT_FIELDS, &mut *out, &token) {
                    out.warn(format!("ignored {}: {e}", token.tag));
                }
                ScanState::Idle
            }
            (state, _) => state,
        }
    }
}

/// Result of a successful scan: the document plus per-record warnings.
#[derive(Debug, Clone)]
pub struct Scan {
    pub document: ParsedDocument,
    pub warnings: Vec<String>,
}

pub fn scan(sanitized: &str) -> Result<Scan, OfxError> {
    let mut out = ScanOutput::default();
    let mut state = ScanState::Idle;

    for line in sanitized.lines() {
        state = state.step(line, &mut out);
    }
    if let ScanState::InTransaction(draft) = state {
        out.discard(draft, "not closed before the end of the document");
    }

    tracing::debug!(
        accepted = out.transactions.len(),
        warnings = out.warnings.len(),
        "scan complete"
    );
    out.into_scan()
}
