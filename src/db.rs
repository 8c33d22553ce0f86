use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    account_type TEXT NOT NULL,
    institution TEXT,
    last_four TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    parent_id INTEGER,
    category_type TEXT NOT NULL,
    description TEXT,
    is_active INTEGER DEFAULT 1,
    FOREIGN KEY (parent_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    category_id INTEGER,
    vendor TEXT,
    notes TEXT,
    is_flagged INTEGER DEFAULT 0,
    flag_reason TEXT,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS rules (
    id INTEGER PRIMARY KEY,
    pattern TEXT NOT NULL,
    match_type TEXT DEFAULT 'contains',
    vendor TEXT,
    category_id INTEGER NOT NULL,
    priority INTEGER DEFAULT 0,
    hit_count INTEGER DEFAULT 0,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);
";

/// Column additions applied in order; `PRAGMA user_version` records the last one run.
const MIGRATIONS: &[(i64, &str)] = &[
    (
        1,
        "ALTER TABLE accounts ADD COLUMN external_id TEXT;
         ALTER TABLE accounts ADD COLUMN currency_code TEXT DEFAULT 'USD';
         ALTER TABLE accounts ADD COLUMN balance REAL DEFAULT 0;
         ALTER TABLE accounts ADD COLUMN balance_date TEXT;",
    ),
    (
        2,
        "ALTER TABLE transactions ADD COLUMN external_id TEXT;
         ALTER TABLE transactions ADD COLUMN transaction_type TEXT;
         ALTER TABLE transactions ADD COLUMN is_pending INTEGER DEFAULT 0;
         CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_external
             ON transactions(account_id, external_id) WHERE external_id IS NOT NULL;",
    ),
    (
        3,
        "ALTER TABLE categories ADD COLUMN color TEXT;
         ALTER TABLE categories ADD COLUMN icon TEXT;",
    ),
];

// (name, category_type, description, color, icon)
const DEFAULT_CATEGORIES: &[(&str, &str, &str, &str, &str)] = &[
    // Income
    ("Salary", "income", "Paychecks and direct deposits", "#2e7d32", "\u{1f4bc}"),
    ("Interest", "income", "Bank and savings interest", "#388e3c", "\u{1f3e6}"),
    ("Refunds", "income", "Merchant refunds and reimbursements", "#43a047", "\u{21a9}"),
    ("Other Income", "income", "Anything else coming in", "#66bb6a", "\u{1f4b5}"),
    // Expenses
    ("Groceries", "expense", "Supermarkets and food shopping", "#ef6c00", "\u{1f6d2}"),
    ("Dining Out", "expense", "Restaurants, cafes, takeaway", "#f57c00", "\u{1f37d}"),
    ("Housing", "expense", "Rent, mortgage, property costs", "#6d4c41", "\u{1f3e0}"),
    ("Utilities", "expense", "Power, water, internet, phone", "#0277bd", "\u{1f4a1}"),
    ("Transportation", "expense", "Fuel, transit, parking, rideshare", "#00838f", "\u{1f697}"),
    ("Shopping", "expense", "General retail purchases", "#ad1457", "\u{1f6cd}"),
    ("Entertainment", "expense", "Movies, events, hobbies", "#6a1b9a", "\u{1f3ac}"),
    ("Healthcare", "expense", "Doctors, pharmacy, dental", "#c62828", "\u{1f3e5}"),
    ("Insurance", "expense", "Health, auto, home insurance", "#4527a0", "\u{1f6e1}"),
    ("Subscriptions", "expense", "Streaming, software, memberships", "#283593", "\u{1f4fa}"),
    ("Travel", "expense", "Flights, hotels, vacations", "#1565c0", "\u{2708}"),
    ("Fees & Charges", "expense", "Bank fees, interest charges, ATM fees", "#757575", "\u{1f4b8}"),
    ("Transfer", "expense", "Transfers between own accounts", "#9e9e9e", "\u{1f501}"),
    ("Uncategorized", "expense", "Needs review", "#bdbdbd", "\u{2753}"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn migrate(conn: &Connection) -> Result<()> {
    let current = schema_version(conn)?;
    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        tracing::debug!(version, "applying schema migration");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {version}"))?;
        tx.commit()?;
    }
    Ok(())
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    migrate(conn)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for cat in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, category_type, description, color, icon) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![cat.0, cat.1, cat.2, cat.3, cat.4],
            )?;
        }
    }
    Ok(())
}

pub fn find_category_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let mut stmt =
        conn.prepare_cached("SELECT id FROM categories WHERE lower(name) = lower(?1) AND is_active = 1")?;
    let mut rows = stmt.query([name.trim()])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
