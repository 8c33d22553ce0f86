use regex::Regex;
use rusqlite::Connection;

use crate::error::{DollarError, Result};
use crate::models::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Contains,
    StartsWith,
    Regex,
}

impl MatchType {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "regex" => Ok(Self::Regex),
            other => Err(DollarError::Other(format!(
                "Unknown match type '{other}' (expected contains, starts_with or regex)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::Regex => "regex",
        }
    }
}

/// A rule ready to run: regex patterns are compiled once per categorize pass.
struct CompiledRule {
    rule: Rule,
    matcher: Matcher,
}

enum Matcher {
    Contains(String),
    StartsWith(String),
    Regex(Regex),
}

impl CompiledRule {
    fn compile(rule: Rule) -> Option<Self> {
        let matcher = match MatchType::parse(&rule.match_type).ok()? {
            MatchType::Contains => Matcher::Contains(rule.pattern.to_uppercase()),
            MatchType::StartsWith => Matcher::StartsWith(rule.pattern.to_uppercase()),
            MatchType::Regex => match Regex::new(&rule.pattern) {
                Ok(re) => Matcher::Regex(re),
                Err(e) => {
                    tracing::warn!(rule_id = ?rule.id, error = %e, "skipping rule with invalid regex");
                    return None;
                }
            },
        };
        Some(Self { rule, matcher })
    }

    fn matches_text(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Contains(pat) => text.to_uppercase().contains(pat.as_str()),
            Matcher::StartsWith(pat) => text.to_uppercase().starts_with(pat.as_str()),
            Matcher::Regex(re) => re.is_match(text),
        }
    }

    /// Rules look at the description first, then the payee.
    fn matches(&self, description: &str, payee: Option<&str>) -> bool {
        self.matches_text(description) || payee.is_some_and(|p| self.matches_text(p))
    }
}

pub struct CategorizeResult {
    pub categorized: usize,
    pub still_flagged: usize,
}

fn load_rules(conn: &Connection) -> Result<Vec<CompiledRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, pattern, category_id, match_type, vendor FROM rules \
         WHERE is_active = 1 ORDER BY priority DESC, id ASC",
    )?;
    let rules = stmt
        .query_map([], |row| {
            Ok(Rule {
                id: row.get(0)?,
                pattern: row.get(1)?,
                category_id: row.get(2)?,
                match_type: row.get(3)?,
                vendor: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rules.into_iter().filter_map(CompiledRule::compile).collect())
}

pub fn categorize_transactions(conn: &Connection) -> Result<CategorizeResult> {
    let rules = load_rules(conn)?;

    let mut txn_stmt =
        conn.prepare("SELECT id, description, vendor FROM transactions WHERE category_id IS NULL")?;
    let flagged: Vec<(i64, String, Option<String>)> = txn_stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut categorized = 0usize;
    let mut still_flagged = 0usize;

    for (txn_id, description, payee) in &flagged {
        let hit = rules.iter().find(|r| r.matches(description, payee.as_deref()));
        match hit {
            Some(compiled) => {
                let rule = &compiled.rule;
                conn.execute(
                    "UPDATE transactions SET category_id = ?1, vendor = COALESCE(?2, vendor), is_flagged = 0, flag_reason = NULL WHERE id = ?3",
                    rusqlite::params![rule.category_id, rule.vendor, txn_id],
                )?;
                conn.execute(
                    "UPDATE rules SET hit_count = hit_count + 1 WHERE id = ?1",
                    [rule.id],
                )?;
                categorized += 1;
            }
            None => still_flagged += 1,
        }
    }

    tracing::debug!(categorized, still_flagged, "categorize pass finished");
    Ok(CategorizeResult {
        categorized,
        still_flagged,
    })
}
