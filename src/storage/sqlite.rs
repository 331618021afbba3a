//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ItemStore trait.

use crate::record::ItemRecord;
use crate::storage::schema::{initialize_collection, quote_table};
use crate::storage::traits::{ItemStore, StorageError, StorageResult};
use crate::storage::{CollectionStats, SymbolRow};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex that is locked for exactly one store
/// call at a time.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn to_sql_number(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_number(column: &'static str, value: i64) -> StorageResult<u64> {
    u64::try_from(value).map_err(|_| StorageError::OutOfRange { column, value })
}

impl ItemStore for SqliteStore {
    // ===== Collection Lifecycle =====

    fn list_collections(&self) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;

        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tables)
    }

    fn create_collection(&self, table: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        initialize_collection(&conn, table)
    }

    // ===== Writes =====

    fn insert_batch(&self, table: &str, records: &[ItemRecord]) -> StorageResult<usize> {
        let quoted = quote_table(table)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {quoted} (
                    name, number, m, bd, s,
                    mchance, bdchance, schance,
                    hex1, hex2, s_in_dir
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ))?;

            for record in records {
                inserted += stmt.execute(params![
                    record.name,
                    to_sql_number(record.number),
                    record.model,
                    record.backdrop,
                    record.symbol,
                    record.model_rarity,
                    record.backdrop_rarity,
                    record.symbol_rarity,
                    record.hex1,
                    record.hex2,
                    record.bucket_label,
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn set_bucket_label(&self, table: &str, id: i64, label: &str) -> StorageResult<()> {
        let quoted = quote_table(table)?;
        let conn = self.lock()?;
        conn.execute(
            &format!("UPDATE {quoted} SET s_in_dir = ?1 WHERE id = ?2"),
            params![label, id],
        )?;
        Ok(())
    }

    fn set_bucket_label_for_symbol(
        &self,
        table: &str,
        name: &str,
        symbol: &str,
        label: &str,
    ) -> StorageResult<usize> {
        let quoted = quote_table(table)?;
        let conn = self.lock()?;
        let updated = conn.execute(
            &format!("UPDATE {quoted} SET s_in_dir = ?1 WHERE s = ?2 AND name = ?3"),
            params![label, symbol, name],
        )?;
        Ok(updated)
    }

    // ===== Reads =====

    fn max_number(&self, table: &str) -> StorageResult<u64> {
        let quoted = quote_table(table)?;
        let conn = self.lock()?;
        let max: i64 = conn.query_row(
            &format!("SELECT COALESCE(MAX(number), 0) FROM {quoted}"),
            [],
            |row| row.get(0),
        )?;
        from_sql_number("number", max)
    }

    fn symbol_rows(&self, table: &str, name: &str) -> StorageResult<Vec<SymbolRow>> {
        let quoted = quote_table(table)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, number, s, s_in_dir FROM {quoted} WHERE name = ?1 ORDER BY id"
        ))?;

        let rows = stmt
            .query_map(params![name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, number, symbol, bucket_label)| {
                Ok(SymbolRow {
                    id,
                    number: from_sql_number("number", number)?,
                    symbol,
                    bucket_label,
                })
            })
            .collect()
    }

    fn first_number_per_model(
        &self,
        table: &str,
        name: &str,
    ) -> StorageResult<Vec<(String, u64)>> {
        let quoted = quote_table(table)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT m, MIN(number) FROM {quoted} WHERE name = ?1 GROUP BY m ORDER BY m"
        ))?;

        let rows = stmt
            .query_map(params![name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(model, number)| Ok((model, from_sql_number("number", number)?)))
            .collect()
    }

    fn collection_stats(&self, table: &str) -> StorageResult<CollectionStats> {
        let quoted = quote_table(table)?;
        let conn = self.lock()?;
        let stats = conn.query_row(
            &format!(
                "SELECT COUNT(*), COALESCE(MAX(number), 0),
                        COUNT(DISTINCT m), COUNT(DISTINCT bd), COUNT(DISTINCT s),
                        COUNT(s_in_dir)
                 FROM {quoted}"
            ),
            [],
            |row| {
                Ok(CollectionStats {
                    table: table.to_string(),
                    rows: row.get::<_, i64>(0)? as u64,
                    max_number: row.get::<_, i64>(1)? as u64,
                    distinct_models: row.get::<_, i64>(2)? as u64,
                    distinct_backdrops: row.get::<_, i64>(3)? as u64,
                    distinct_symbols: row.get::<_, i64>(4)? as u64,
                    labelled_rows: row.get::<_, i64>(5)? as u64,
                })
            },
        )?;
        Ok(stats)
    }
}
