#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: String,
    pub institution: Option<String>,
    pub external_id: Option<String>,
    pub currency_code: String,
    pub balance: f64,
    pub balance_date: Option<String>,
}

/// An active rule as the categorizer runs it; callers load rules already
/// filtered to active and ordered by priority.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: i64,
    pub pattern: String,
    pub category_id: i64,
    pub match_type: String,
    pub vendor: Option<String>,
}
