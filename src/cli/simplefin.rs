use std::path::Path;

use chrono::Local;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::categorizer::categorize_transactions;
use crate::db::{get_connection, init_db};
use crate::error::{DollarError, Result};
use crate::fmt::money;
use crate::settings::{save_settings, Settings};
use crate::simplefin::{claim_setup_token, pull, AccessUrl, FetchWindow, NormalizeReport, SimpleFinClient};
use crate::sync::sync_accounts;

fn stored_access_url(settings: &Settings) -> Result<AccessUrl> {
    let raw = settings.simplefin_access_url.as_deref().ok_or_else(|| {
        DollarError::NotConfigured(
            "no SimpleFin connection; run `dollardollar simplefin claim <TOKEN>` first".to_string(),
        )
    })?;
    AccessUrl::parse(raw)
}

fn fetch_window(settings: &Settings, days: Option<u32>, balances_only: bool) -> FetchWindow {
    if balances_only {
        FetchWindow::balances_only()
    } else {
        FetchWindow::days(days.unwrap_or(settings.lookback_days))
    }
}

fn print_report(report: &NormalizeReport) {
    let mut table = Table::new();
    table.set_header(vec!["Account", "Institution", "Type", "Balance", "Currency", "Transactions"]);
    for a in &report.accounts {
        table.add_row(vec![
            Cell::new(&a.name),
            Cell::new(&a.institution),
            Cell::new(&a.account_type),
            Cell::new(money(a.balance)),
            Cell::new(&a.currency_code),
            Cell::new(a.transactions.len()),
        ]);
    }
    println!("SimpleFin accounts\n{table}");

    for note in &report.notes {
        println!("{} {note}", "note:".cyan());
    }
    for warning in &report.warnings {
        println!("{} skipped {warning}", "warning:".yellow());
    }
}

pub fn claim(settings: &Settings, client: &SimpleFinClient, token: &str) -> Result<()> {
    let access = claim_setup_token(client, token)?;
    let mut settings = settings.clone();
    settings.simplefin_access_url = Some(access.to_url_string());
    save_settings(&settings)?;
    println!("Connected to SimpleFin at {}", access.base_url());
    Ok(())
}

pub fn fetch(
    settings: &Settings,
    client: &SimpleFinClient,
    days: Option<u32>,
    balances_only: bool,
    output: Option<&str>,
) -> Result<()> {
    let access = stored_access_url(settings)?;
    let window = fetch_window(settings, days, balances_only);
    let report = pull(client, &access, &window, &Local)?;
    print_report(&report);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(Path::new(path), format!("{json}\n"))?;
        println!("Wrote {path}");
    }
    Ok(())
}

pub fn sync(
    settings: &Settings,
    client: &SimpleFinClient,
    days: Option<u32>,
    balances_only: bool,
) -> Result<()> {
    let access = stored_access_url(settings)?;
    let window = fetch_window(settings, days, balances_only);
    let report = pull(client, &access, &window, &Local)?;
    print_report(&report);

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    let result = sync_accounts(&conn, &report.accounts, Local::now().date_naive())?;
    println!(
        "{} accounts created, {} updated ({} unchanged)",
        result.accounts_created, result.accounts_updated, result.accounts_unchanged
    );
    println!(
        "{} imported, {} settled, {} skipped (duplicates)",
        result.imported, result.settled, result.skipped
    );

    let cat_result = categorize_transactions(&conn)?;
    println!(
        "{} categorized, {} still flagged",
        cat_result.categorized, cat_result.still_flagged
    );
    Ok(())
}
