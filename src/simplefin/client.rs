//! Blocking SimpleFin transport: claim exchange and account fetch.
//!
//! Neither call is retried. Claim URLs are single-use, and a failed fetch is
//! surfaced to the caller, who may simply run the command again.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use serde_json::Value;

use super::token::AccessUrl;
use crate::error::{DollarError, Result};

const BODY_PREVIEW_CHARS: usize = 200;
const USER_AGENT: &str = concat!("dollardollar/", env!("CARGO_PKG_VERSION"));

/// How much transaction history to request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchWindow {
    /// `None` asks for balances only.
    pub lookback_days: Option<u32>,
}

impl FetchWindow {
    pub fn balances_only() -> Self {
        Self { lookback_days: None }
    }

    pub fn days(days: u32) -> Self {
        Self {
            lookback_days: Some(days),
        }
    }

    /// Unix timestamp for the `start-date` query parameter.
    pub fn start_date(&self, now: DateTime<Utc>) -> Option<i64> {
        self.lookback_days
            .map(|days| (now - chrono::Duration::days(i64::from(days))).timestamp())
    }
}

pub struct SimpleFinClient {
    client: Client,
}

impl SimpleFinClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    #[cfg(test)]
    pub(crate) fn without_proxy(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).no_proxy().build()?;
        Ok(Self { client })
    }

    /// Exchange a claim URL for the long-lived access URL.
    pub fn claim(&self, claim_url: &str) -> Result<AccessUrl> {
        tracing::info!("claiming SimpleFin access URL");
        let response = self
            .client
            .post(claim_url)
            .header(CONTENT_LENGTH, 0)
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "SimpleFin claim rejected");
            return Err(DollarError::Claim {
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }
        AccessUrl::parse(&body)
    }

    /// GET `{base_url}/accounts` and return the decoded JSON object.
    pub fn fetch_accounts(&self, access: &AccessUrl, window: &FetchWindow) -> Result<Value> {
        let url = format!("{}/accounts", access.base_url());
        let mut request = self
            .client
            .get(&url)
            .basic_auth(access.username(), Some(access.password()))
            .header(ACCEPT, "application/json");
        request = match window.start_date(Utc::now()) {
            Some(start) => request.query(&[("start-date", start.to_string())]),
            None => request.query(&[("balances-only", "1")]),
        };

        tracing::info!(url = %url, lookback_days = ?window.lookback_days, "fetching SimpleFin accounts");
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "SimpleFin fetch failed");
            return Err(DollarError::Fetch {
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| DollarError::Parse(format!("accounts response is not JSON: {e}")))?;
        if !value.is_object() {
            return Err(DollarError::Parse(
                "accounts response is not a JSON object".to_string(),
            ));
        }
        Ok(value)
    }
}

fn body_preview(body: &str) -> String {
    let trimmed = body.trim();
    let preview: String = trimmed.chars().take(BODY_PREVIEW_CHARS).collect();
    if trimmed.chars().count() > BODY_PREVIEW_CHARS {
        format!("{preview}...")
    } else {
        preview
    }
}
