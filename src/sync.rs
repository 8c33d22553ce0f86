//! Persist normalized SimpleFin accounts into the local ledger.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::prelude::ToPrimitive;
use sha2::{Digest, Sha256};

use crate::db::find_category_id;
use crate::error::Result;
use crate::simplefin::{NormalizedAccount, NormalizedTransaction};

const IMPORT_SOURCE: &str = "simplefin";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub accounts_created: usize,
    pub accounts_updated: usize,
    /// Accounts whose payload matched an earlier sync exactly.
    pub accounts_unchanged: usize,
    pub imported: usize,
    /// Pending rows that have since posted.
    pub settled: usize,
    pub skipped: usize,
}

fn payload_checksum(account: &NormalizedAccount) -> Result<String> {
    let data = serde_json::to_vec(account)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn to_real(amount: rust_decimal::Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

/// Content match against earlier imports only. Identical rows inside one
/// payload are separate purchases.
fn is_duplicate_row(
    conn: &Connection,
    account_id: i64,
    import_id: i64,
    txn: &NormalizedTransaction,
) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions WHERE account_id = ?1 AND date = ?2 AND amount = ?3 AND description = ?4 \
         AND (import_id IS NULL OR import_id != ?5)",
    )?;
    Ok(stmt.exists(rusqlite::params![
        account_id,
        txn.date.to_string(),
        to_real(txn.amount),
        txn.description,
        import_id
    ])?)
}

/// Find the ledger account for `account`, creating it if needed.
/// Returns `(account_id, created)`.
fn upsert_account(conn: &Connection, account: &NormalizedAccount, as_of: NaiveDate) -> Result<(i64, bool)> {
    let by_external = match &account.external_id {
        Some(ext) => conn
            .query_row(
                "SELECT id FROM accounts WHERE external_id = ?1",
                [ext],
                |row| row.get::<_, i64>(0),
            )
            .optional()?,
        None => None,
    };
    let existing = match by_external {
        Some(id) => Some(id),
        None => conn
            .query_row(
                "SELECT id FROM accounts WHERE name = ?1 AND external_id IS NULL",
                [&account.name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?,
    };

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE accounts SET external_id = COALESCE(external_id, ?1), balance = ?2, balance_date = ?3, \
                 currency_code = ?4, institution = ?5 WHERE id = ?6",
                rusqlite::params![
                    account.external_id,
                    to_real(account.balance),
                    as_of.to_string(),
                    account.currency_code,
                    account.institution,
                    id
                ],
            )?;
            Ok((id, false))
        }
        None => {
            conn.execute(
                "INSERT INTO accounts (name, account_type, institution, external_id, currency_code, balance, balance_date) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    account.name,
                    account.account_type,
                    account.institution,
                    account.external_id,
                    account.currency_code,
                    to_real(account.balance),
                    as_of.to_string()
                ],
            )?;
            Ok((conn.last_insert_rowid(), true))
        }
    }
}

enum RowOutcome {
    Inserted,
    Settled,
    Skipped,
}

fn upsert_transaction(
    conn: &Connection,
    account_id: i64,
    import_id: i64,
    txn: &NormalizedTransaction,
) -> Result<RowOutcome> {
    if let Some(ext) = &txn.external_id {
        let existing: Option<(i64, bool)> = conn
            .query_row(
                "SELECT id, is_pending FROM transactions WHERE account_id = ?1 AND external_id = ?2",
                rusqlite::params![account_id, ext],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        if let Some((id, was_pending)) = existing {
            if was_pending && !txn.pending {
                conn.execute(
                    "UPDATE transactions SET is_pending = 0, date = ?1, amount = ?2, description = ?3 WHERE id = ?4",
                    rusqlite::params![txn.date.to_string(), to_real(txn.amount), txn.description, id],
                )?;
                return Ok(RowOutcome::Settled);
            }
            return Ok(RowOutcome::Skipped);
        }
    } else if is_duplicate_row(conn, account_id, import_id, txn)? {
        return Ok(RowOutcome::Skipped);
    }

    let category_id = match &txn.category_name {
        Some(name) => find_category_id(conn, name)?,
        None => None,
    };
    let (is_flagged, flag_reason) = if category_id.is_some() {
        (false, None)
    } else {
        (true, Some("No matching rule"))
    };

    conn.execute(
        "INSERT INTO transactions (account_id, date, description, amount, category_id, vendor, notes, \
         is_flagged, flag_reason, import_id, external_id, transaction_type, is_pending) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            account_id,
            txn.date.to_string(),
            txn.description,
            to_real(txn.amount),
            category_id,
            txn.payee,
            txn.memo,
            is_flagged,
            flag_reason,
            import_id,
            txn.external_id,
            txn.transaction_type.as_str(),
            txn.pending,
        ],
    )?;
    Ok(RowOutcome::Inserted)
}

/// Write accounts and their transactions. `as_of` stamps the balance date.
pub fn sync_accounts(conn: &Connection, accounts: &[NormalizedAccount], as_of: NaiveDate) -> Result<SyncResult> {
    let mut result = SyncResult::default();
    let tx = conn.unchecked_transaction()?;

    for account in accounts {
        let (account_id, created) = upsert_account(&tx, account, as_of)?;
        if created {
            result.accounts_created += 1;
        } else {
            result.accounts_updated += 1;
        }

        let checksum = payload_checksum(account)?;
        let seen: bool = {
            let mut stmt = tx.prepare_cached(
                "SELECT 1 FROM imports WHERE checksum = ?1 AND account_id = ?2 AND filename = ?3",
            )?;
            stmt.exists(rusqlite::params![checksum, account_id, IMPORT_SOURCE])?
        };
        if seen {
            tracing::debug!(account = %account.name, "payload unchanged since last sync");
            result.accounts_unchanged += 1;
            continue;
        }

        let min_date = account.transactions.iter().map(|t| t.date).min();
        let max_date = account.transactions.iter().map(|t| t.date).max();
        tx.execute(
            "INSERT INTO imports (filename, account_id, record_count, date_range_start, date_range_end, checksum) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                IMPORT_SOURCE,
                account_id,
                account.transactions.len() as i64,
                min_date.map(|d| d.to_string()),
                max_date.map(|d| d.to_string()),
                checksum,
            ],
        )?;
        let import_id = tx.last_insert_rowid();

        for txn in &account.transactions {
            match upsert_transaction(&tx, account_id, import_id, txn)? {
                RowOutcome::Inserted => result.imported += 1,
                RowOutcome::Settled => result.settled += 1,
                RowOutcome::Skipped => result.skipped += 1,
            }
        }
    }

    tx.commit()?;
    tracing::info!(?result, "ledger sync complete");
    Ok(result)
}
