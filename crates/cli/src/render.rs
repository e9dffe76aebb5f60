use std::fmt::{self, Write};

use razao_import::ImportOutcome;

/// Human-readable summary of one import.
pub fn text(source: &str, outcome: &ImportOutcome) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_text(&mut out, source, outcome)?;
    Ok(out)
}

fn write_text(out: &mut impl Write, source: &str, outcome: &ImportOutcome) -> fmt::Result {
    let doc = &outcome.document;
    let report = &outcome.report;

    writeln!(out, "{source}")?;
    writeln!(out, "  sha256:       {}", outcome.source_sha256)?;
    write!(
        out,
        "  account:      {} (bank {}, {})",
        doc.account.account_id, doc.account.bank_id, doc.account.account_type
    )?;
    if let Some(branch) = &doc.account.routing_number {
        write!(out, " branch {branch}")?;
    }
    writeln!(out)?;

    if let Some(currency) = &doc.currency {
        writeln!(out, "  currency:     {currency}")?;
    }
    if let Some(period) = &doc.period {
        writeln!(out, "  period:       {period}")?;
    }
    if let Some(balance) = &doc.balance {
        let amount = balance
            .amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| "?".to_string());
        match balance.as_of {
            Some(as_of) => writeln!(out, "  balance:      {amount} as of {}", as_of.date())?,
            None => writeln!(out, "  balance:      {amount}")?,
        }
    }

    writeln!(out, "  transactions: {}", report.total_transactions)?;
    writeln!(out, "  duplicates:   {}", report.duplicates_removed)?;
    writeln!(out, "  dates:        {}", report.date_range)?;
    writeln!(out, "  amounts:      {}", report.amount_range)?;

    writeln!(out, "  categories:")?;
    for (category, count) in &report.categories {
        writeln!(out, "    {:<12}{count:>5}", category.to_string())?;
    }

    if !outcome.warnings.is_empty() {
        writeln!(out, "  warnings:")?;
        for warning in &outcome.warnings {
            writeln!(out, "    - {warning}")?;
        }
    }
    Ok(())
}

/// One JSON object per import, keyed by source path.
pub fn json(source: &str, outcome: &ImportOutcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "source": source,
        "outcome": outcome,
    }))
}
