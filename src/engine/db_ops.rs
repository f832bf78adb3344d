//! Work-list store: schema and CRUD over the persistent erasure list.

use std::path::Path;

use log::debug;
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::types::{ENTROPY_UNKNOWN, FileFlags, WorkRecord};

/// Capability contract for the persistent work list.
pub trait WorkListStore: Send {
    fn read_all(&self) -> Result<Vec<WorkRecord>>;
    fn insert(&self, key: &str, path: &str, flags: FileFlags) -> Result<()>;
    fn update_entropy(&self, key: &str, entropy: f64) -> Result<()>;
    /// Returns false when no row matched the key.
    fn delete(&self, key: &str) -> Result<bool>;
    /// Drop every row. The store stays usable afterwards.
    fn drop_table(&self) -> Result<()>;
    /// Drop rows whose system-added bit is clear.
    fn delete_user_rows(&self) -> Result<()>;
}

/// Schema for the erasure work list.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS filetable (
    hash TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    entropy REAL NOT NULL,
    flags INT8 NOT NULL
);
"#;

const INSERT_SQL: &str =
    "INSERT INTO filetable (hash, filename, entropy, flags) VALUES (?1, ?2, ?3, ?4)";

/// SQLite-backed work list.
pub struct SqliteWorkList {
    conn: Connection,
}

impl SqliteWorkList {
    /// Open or create the work-list DB and ensure the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// In-memory store with the same schema (tests, one-shot shredding).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl WorkListStore for SqliteWorkList {
    fn read_all(&self) -> Result<Vec<WorkRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT hash, filename, entropy, flags FROM filetable")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let path: String = row.get(1)?;
            let entropy: f64 = row.get(2)?;
            let flags: i64 = row.get(3)?;
            Ok(WorkRecord {
                key,
                path,
                entropy,
                flags: FileFlags::from_bits(flags),
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        debug!("read {} work-list rows", records.len());
        Ok(records)
    }

    fn insert(&self, key: &str, path: &str, flags: FileFlags) -> Result<()> {
        self.conn
            .execute(INSERT_SQL, params![key, path, ENTROPY_UNKNOWN, flags.bits()])?;
        Ok(())
    }

    fn update_entropy(&self, key: &str, entropy: f64) -> Result<()> {
        self.conn.execute(
            "UPDATE filetable SET entropy = ?1 WHERE hash = ?2",
            params![entropy, key],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM filetable WHERE hash = ?1", params![key])?;
        Ok(affected > 0)
    }

    fn drop_table(&self) -> Result<()> {
        self.conn.execute_batch("DROP TABLE IF EXISTS filetable")?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn delete_user_rows(&self) -> Result<()> {
        // SystemAdded bit clear: flags 0 (dir) or 2 (file).
        self.conn
            .execute("DELETE FROM filetable WHERE flags IN (0, 2)", [])?;
        Ok(())
    }
}
