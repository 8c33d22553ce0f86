//! SimpleFin aggregator integration: token -> claim -> fetch -> normalize.

pub mod client;
pub mod model;
pub mod normalize;
pub mod token;

use chrono::TimeZone;

pub use client::{FetchWindow, SimpleFinClient};
pub use model::{NormalizeReport, NormalizedAccount, NormalizedTransaction, TransactionType};
pub use normalize::normalize_accounts;
pub use token::{decode_setup_token, AccessUrl};

use crate::error::Result;

/// Decode a setup token and claim it. The token is spent after this call.
pub fn claim_setup_token(client: &SimpleFinClient, setup_token: &str) -> Result<AccessUrl> {
    let claim_url = decode_setup_token(setup_token)?;
    client.claim(&claim_url)
}

/// Fetch accounts and normalize them in one pass.
pub fn pull<Tz: TimeZone>(
    client: &SimpleFinClient,
    access: &AccessUrl,
    window: &FetchWindow,
    tz: &Tz,
) -> Result<NormalizeReport> {
    let body = client.fetch_accounts(access, window)?;
    let report = normalize_accounts(&body, tz);
    tracing::info!(
        accounts = report.accounts.len(),
        transactions = report.transaction_count(),
        warnings = report.warnings.len(),
        "normalized SimpleFin response"
    );
    Ok(report)
}
