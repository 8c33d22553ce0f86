use std::str::FromStr;

use chrono::{NaiveDate, TimeZone};
use rust_decimal::Decimal;
use serde_json::Value;

use super::model::{
    NormalizationWarning, NormalizeReport, NormalizedAccount, NormalizedTransaction, RawAccount,
    RawTransaction, TransactionType,
};

const UNKNOWN_INSTITUTION: &str = "Unknown";
const DEFAULT_CURRENCY: &str = "USD";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a decimal from a JSON string or number. Tolerates `$` and `,`.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => {
            let cleaned = s.trim().replace([',', '$'], "");
            Decimal::from_str(&cleaned)
                .or_else(|_| Decimal::from_scientific(&cleaned))
                .ok()
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

/// Epoch seconds from a JSON number or numeric string.
pub fn parse_posted(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn posted_to_date<Tz: TimeZone>(posted: i64, tz: &Tz) -> Option<NaiveDate> {
    tz.timestamp_opt(posted, 0)
        .single()
        .map(|dt| dt.date_naive())
}

/// Best guess at an account type when the aggregator leaves it blank.
pub fn infer_account_type(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.contains("credit") || lower.contains("card") {
        "credit"
    } else if lower.contains("saving") {
        "savings"
    } else if ["invest", "brokerage", "401k", "ira", "retirement"]
        .iter()
        .any(|k| lower.contains(k))
    {
        "investment"
    } else if lower.contains("loan") || lower.contains("mortgage") {
        "loan"
    } else {
        "checking"
    }
}

fn non_empty(s: Option<&String>) -> Option<String> {
    s.map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// normalize_accounts
// ---------------------------------------------------------------------------

/// Turn a raw `/accounts` response into normalized accounts.
///
/// Never fails: records that cannot be used are skipped and reported in
/// [`NormalizeReport::warnings`], so one bad entry does not hide the rest.
pub fn normalize_accounts<Tz: TimeZone>(body: &Value, tz: &Tz) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        for e in errors {
            let note = e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string());
            tracing::warn!(note = %note, "aggregator reported an error");
            report.notes.push(note);
        }
    }

    let Some(raw_accounts) = body.get("accounts") else {
        tracing::warn!("response has no accounts key");
        report
            .notes
            .push("response has no 'accounts' key; nothing to normalize".to_string());
        return report;
    };
    let Some(raw_accounts) = raw_accounts.as_array() else {
        report.warnings.push(NormalizationWarning {
            account: "(response)".to_string(),
            transaction_id: None,
            reason: "'accounts' is not a list".to_string(),
        });
        return report;
    };

    for (index, value) in raw_accounts.iter().enumerate() {
        let Some(raw) = RawAccount::from_value(value) else {
            let warning = NormalizationWarning {
                account: format!("account #{}", index + 1),
                transaction_id: None,
                reason: "account entry is not an object".to_string(),
            };
            tracing::warn!(%warning, "skipping account");
            report.warnings.push(warning);
            continue;
        };
        let account = normalize_account(raw, tz, &mut report.warnings);
        if value
            .get("transactions")
            .is_some_and(|t| !t.is_array() && !t.is_null())
        {
            tracing::warn!(account = %account.name, "transactions is not a list");
            report
                .notes
                .push(format!("{}: 'transactions' is not a list; treated as empty", account.name));
        }
        report.accounts.push(account);
    }

    report
}

fn normalize_account<Tz: TimeZone>(
    raw: RawAccount,
    tz: &Tz,
    warnings: &mut Vec<NormalizationWarning>,
) -> NormalizedAccount {
    let name = non_empty(raw.name.as_ref())
        .or_else(|| raw.id.clone())
        .unwrap_or_else(|| "Unnamed account".to_string());

    let institution = raw
        .org
        .as_ref()
        .and_then(|org| non_empty(org.name.as_ref()))
        .unwrap_or_else(|| UNKNOWN_INSTITUTION.to_string());

    let balance = match raw.balance.as_ref().map(parse_decimal) {
        Some(Some(b)) => b,
        Some(None) => {
            tracing::debug!(account = %name, "unparsable balance, using 0");
            Decimal::ZERO
        }
        None => Decimal::ZERO,
    };

    let account_type = non_empty(raw.account_type.as_ref())
        .map(|t| t.to_lowercase())
        .unwrap_or_else(|| infer_account_type(&name).to_string());

    let currency_code = non_empty(raw.currency.as_ref())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let raw_transactions = raw.transactions.unwrap_or_default();
    let mut transactions = Vec::with_capacity(raw_transactions.len());
    for value in &raw_transactions {
        match normalize_transaction(value, tz) {
            Ok(txn) => transactions.push(txn),
            Err((transaction_id, reason)) => {
                let warning = NormalizationWarning {
                    account: name.clone(),
                    transaction_id,
                    reason,
                };
                tracing::warn!(%warning, "skipping transaction");
                warnings.push(warning);
            }
        }
    }

    NormalizedAccount {
        external_id: raw.id,
        name,
        account_type,
        institution,
        balance,
        currency_code,
        transactions,
    }
}

type Skip = (Option<String>, String);

fn normalize_transaction<Tz: TimeZone>(
    value: &Value,
    tz: &Tz,
) -> std::result::Result<NormalizedTransaction, Skip> {
    let raw = RawTransaction::from_value(value)
        .ok_or_else(|| (None, "transaction entry is not an object".to_string()))?;
    let id = raw.id.clone();

    let amount = match raw.amount.as_ref() {
        None => return Err((id, "missing amount".to_string())),
        Some(v) => parse_decimal(v).ok_or_else(|| (id.clone(), format!("unparsable amount {v}")))?,
    };

    let posted = match raw.posted.as_ref() {
        None => return Err((id, "missing posted timestamp".to_string())),
        Some(v) => parse_posted(v).ok_or_else(|| (id.clone(), format!("unparsable posted timestamp {v}")))?,
    };
    let pending = raw.pending.unwrap_or(false);
    // Pending rows arrive with `posted: 0`; date them by when they happened.
    let when = match raw.transacted_at.as_ref().and_then(parse_posted) {
        Some(at) if pending && posted == 0 && at > 0 => at,
        _ => posted,
    };
    let date = posted_to_date(when, tz)
        .ok_or_else(|| (id.clone(), format!("posted timestamp {when} is out of range")))?;

    let payee = non_empty(raw.payee.as_ref());
    let memo = non_empty(raw.memo.as_ref());
    let description = non_empty(raw.description.as_ref())
        .or_else(|| payee.clone())
        .or_else(|| memo.clone())
        .unwrap_or_default();

    Ok(NormalizedTransaction {
        external_id: raw.id,
        date,
        description,
        payee,
        memo,
        amount,
        transaction_type: TransactionType::from_amount(amount),
        category_name: raw.category,
        pending,
    })
}
