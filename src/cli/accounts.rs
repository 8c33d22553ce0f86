use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money_f64;
use crate::models::Account;
use crate::settings::Settings;

pub fn add(
    settings: &Settings,
    name: &str,
    account_type: &str,
    institution: Option<&str>,
    currency: &str,
) -> Result<()> {
    let conn = get_connection(&settings.db_path())?;
    conn.execute(
        "INSERT INTO accounts (name, account_type, institution, currency_code) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, account_type, institution, currency.to_uppercase()],
    )?;
    println!("Added account: {name}");
    Ok(())
}

pub fn load_accounts(conn: &rusqlite::Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, account_type, institution, external_id, COALESCE(currency_code, 'USD'), \
         COALESCE(balance, 0), balance_date FROM accounts ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                account_type: row.get(2)?,
                institution: row.get(3)?,
                external_id: row.get(4)?,
                currency_code: row.get(5)?,
                balance: row.get(6)?,
                balance_date: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list(settings: &Settings) -> Result<()> {
    let conn = get_connection(&settings.db_path())?;
    let accounts = load_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Institution", "Balance", "Currency", "As Of", "Source"]);
    for a in accounts {
        table.add_row(vec![
            Cell::new(a.id),
            Cell::new(a.name),
            Cell::new(a.account_type),
            Cell::new(a.institution.unwrap_or_default()),
            Cell::new(money_f64(a.balance)),
            Cell::new(a.currency_code),
            Cell::new(a.balance_date.unwrap_or_default()),
            Cell::new(if a.external_id.is_some() { "simplefin" } else { "manual" }),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
