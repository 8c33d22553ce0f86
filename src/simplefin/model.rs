use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Raw aggregator shapes. Fields are read one at a time out of the JSON value,
// so a wrongly typed field costs that field only, never the whole record.
// The normalizer decides what is required.
// ---------------------------------------------------------------------------

/// Scalar as text: strings as-is, numbers and booleans printed.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn present(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

#[derive(Debug, Clone, Default)]
pub struct RawOrg {
    pub name: Option<String>,
}

impl RawOrg {
    /// Accepts the usual `{ "name": .. }` object or a bare name string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(Self {
                name: text(obj.get("name")),
            }),
            Value::String(name) => Some(Self {
                name: Some(name.clone()),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawAccount {
    pub id: Option<String>,
    pub name: Option<String>,
    pub account_type: Option<String>,
    pub balance: Option<Value>,
    pub currency: Option<String>,
    pub org: Option<RawOrg>,
    /// `None` when absent or not a list.
    pub transactions: Option<Vec<Value>>,
}

impl RawAccount {
    /// `None` only when the entry is not a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            id: text(obj.get("id")),
            name: text(obj.get("name")),
            account_type: text(obj.get("type")),
            balance: present(obj.get("balance")),
            currency: text(obj.get("currency")),
            org: obj.get("org").and_then(RawOrg::from_value),
            transactions: obj.get("transactions").and_then(Value::as_array).cloned(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawTransaction {
    pub id: Option<String>,
    pub posted: Option<Value>,
    /// When the purchase happened; pending rows carry this while `posted` is 0.
    pub transacted_at: Option<Value>,
    pub amount: Option<Value>,
    pub description: Option<String>,
    pub payee: Option<String>,
    pub memo: Option<String>,
    pub pending: Option<bool>,
    pub category: Option<String>,
}

impl RawTransaction {
    /// `None` only when the entry is not a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            id: text(obj.get("id")),
            posted: present(obj.get("posted")),
            transacted_at: present(obj.get("transacted_at")),
            amount: present(obj.get("amount")),
            description: text(obj.get("description")),
            payee: text(obj.get("payee")),
            memo: text(obj.get("memo")),
            pending: flag(obj.get("pending")),
            category: text(obj.get("category")),
        })
    }
}

// ---------------------------------------------------------------------------
// Normalized shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money leaving the account (negative amount).
    Expense,
    /// Money entering the account (zero or positive amount).
    Income,
}

impl TransactionType {
    pub fn from_amount(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Self::Expense
        } else {
            Self::Income
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTransaction {
    pub external_id: Option<String>,
    pub date: NaiveDate,
    pub description: String,
    pub payee: Option<String>,
    pub memo: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub category_name: Option<String>,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedAccount {
    pub external_id: Option<String>,
    pub name: String,
    pub account_type: String,
    pub institution: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub currency_code: String,
    pub transactions: Vec<NormalizedTransaction>,
}

/// A record the normalizer skipped, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationWarning {
    pub account: String,
    pub transaction_id: Option<String>,
    pub reason: String,
}

impl std::fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.transaction_id {
            Some(id) => write!(f, "{} / {}: {}", self.account, id, self.reason),
            None => write!(f, "{}: {}", self.account, self.reason),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    pub accounts: Vec<NormalizedAccount>,
    pub warnings: Vec<NormalizationWarning>,
    /// Aggregator-level messages, e.g. entries of the response `errors` array.
    pub notes: Vec<String>,
}

impl NormalizeReport {
    pub fn transaction_count(&self) -> usize {
        self.accounts.iter().map(|a| a.transactions.len()).sum()
    }
}
