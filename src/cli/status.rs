use crate::db::{get_connection, schema_version};
use crate::error::Result;
use crate::settings::Settings;
use crate::simplefin::AccessUrl;

pub fn run(settings: &Settings) -> Result<()> {
    let db_path = settings.db_path();

    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    let simplefin = match settings.simplefin_access_url.as_deref().map(AccessUrl::parse) {
        Some(Ok(access)) => access.base_url().to_string(),
        Some(Err(_)) => "(invalid access URL)".to_string(),
        None => "(not connected)".to_string(),
    };
    println!("SimpleFin:  {simplefin}");

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
        let transactions: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let flagged: i64 = conn.query_row(
            "SELECT count(*) FROM transactions WHERE is_flagged = 1",
            [],
            |r| r.get(0),
        )?;
        let rules: i64 = conn.query_row("SELECT count(*) FROM rules", [], |r| r.get(0))?;
        let last_sync: Option<String> = conn.query_row(
            "SELECT max(import_date) FROM imports WHERE filename = 'simplefin'",
            [],
            |r| r.get(0),
        )?;

        println!();
        println!("Schema:        v{}", schema_version(&conn)?);
        println!("Accounts:      {accounts}");
        println!("Transactions:  {transactions}");
        println!("Flagged:       {flagged}");
        println!("Rules:         {rules}");
        println!("Last sync:     {}", last_sync.as_deref().unwrap_or("never"));
    } else {
        println!();
        println!("Database not found. Run `dollardollar init` to set up.");
    }

    Ok(())
}
