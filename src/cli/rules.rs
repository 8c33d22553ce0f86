use comfy_table::{Cell, Table};

use crate::categorizer::MatchType;
use crate::db::{find_category_id, get_connection};
use crate::error::{DollarError, Result};
use crate::settings::Settings;

pub fn add(
    settings: &Settings,
    pattern: &str,
    category: &str,
    vendor: Option<&str>,
    match_type: &str,
    priority: i64,
) -> Result<()> {
    let match_type = MatchType::parse(match_type)?;
    if match_type == MatchType::Regex {
        regex::Regex::new(pattern)
            .map_err(|e| DollarError::Other(format!("Invalid regex '{pattern}': {e}")))?;
    }

    let conn = get_connection(&settings.db_path())?;
    let cat_id = find_category_id(&conn, category)?
        .ok_or_else(|| DollarError::UnknownCategory(category.to_string()))?;

    conn.execute(
        "INSERT INTO rules (pattern, match_type, vendor, category_id, priority) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![pattern, match_type.as_str(), vendor, cat_id, priority],
    )?;
    println!("Added rule: '{pattern}' \u{2192} {category}");
    Ok(())
}

pub fn list(settings: &Settings) -> Result<()> {
    let conn = get_connection(&settings.db_path())?;
    let mut stmt = conn.prepare(
        "SELECT r.id, r.pattern, r.match_type, r.vendor, c.name as category, r.priority, r.hit_count \
         FROM rules r JOIN categories c ON r.category_id = c.id \
         WHERE r.is_active = 1 ORDER BY r.priority DESC",
    )?;
    let rows: Vec<(i64, String, String, Option<String>, String, i64, i64)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Pattern", "Type", "Vendor", "Category", "Priority", "Hits"]);
    for (id, pattern, match_type, vendor, category, priority, hits) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(pattern),
            Cell::new(match_type),
            Cell::new(vendor.unwrap_or_default()),
            Cell::new(category),
            Cell::new(priority),
            Cell::new(hits),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}
