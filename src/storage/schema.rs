//! Collection table definitions
//!
//! Each collection gets its own table. Table names come from configuration and
//! the database itself, so they are checked and quoted before being spliced
//! into SQL.

use crate::storage::traits::{StorageError, StorageResult};

/// Checks a table name and returns it quoted for use in SQL
pub fn quote_table(table: &str) -> StorageResult<String> {
    let valid = !table.is_empty()
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());

    if !valid {
        return Err(StorageError::InvalidTableName(table.to_string()));
    }

    Ok(format!("\"{}\"", table))
}

/// SQL creating one collection table and its indexes
///
/// The unique index on `(name, number)` keeps overlapping crawls from
/// storing the same item twice.
pub fn collection_schema_sql(table: &str) -> StorageResult<String> {
    let quoted = quote_table(table)?;
    Ok(format!(
        r#"
CREATE TABLE IF NOT EXISTS {quoted} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    number INTEGER NOT NULL,
    m TEXT NOT NULL,
    bd TEXT NOT NULL,
    s TEXT NOT NULL,
    mchance INTEGER NOT NULL,
    bdchance INTEGER NOT NULL,
    schance INTEGER NOT NULL,
    hex1 CHAR(7),
    hex2 CHAR(7),
    s_in_dir CHAR(6)
);

CREATE UNIQUE INDEX IF NOT EXISTS "idx_{table}_number" ON {quoted}(name, number);
CREATE INDEX IF NOT EXISTS "idx_{table}_symbol" ON {quoted}(s, name);
"#
    ))
}

/// Creates a collection table if it is missing
pub fn initialize_collection(conn: &rusqlite::Connection, table: &str) -> StorageResult<()> {
    conn.execute_batch(&collection_schema_sql(table)?)?;
    Ok(())
}
