use crate::categorizer::categorize_transactions;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let conn = get_connection(&settings.db_path())?;
    let result = categorize_transactions(&conn)?;
    println!(
        "{} categorized, {} still flagged",
        result.categorized, result.still_flagged
    );
    Ok(())
}
