//! SQLite-backed rejection store.
//!
//! Holds the image URLs an editor rejected. The engine only ever sees a
//! [`RejectionSet`] snapshot loaded from here at the start of a batch.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::models::RejectionSet;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS rejected_images (
        url TEXT PRIMARY KEY,
        reason TEXT,
        rejected_at INTEGER NOT NULL
    );";

/// One stored rejection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedImage {
    pub url: String,
    pub reason: Option<String>,
    /// Unix seconds
    pub rejected_at: i64,
}

pub struct RejectionStore {
    conn: Connection,
}

impl RejectionStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open rejection store {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create rejected_images table")?;
        Ok(Self { conn })
    }

    /// Reject an image URL. Returns false if it was already rejected.
    pub fn reject(&self, url: &str, reason: Option<&str>) -> Result<bool> {
        let url = url.trim();
        if url.is_empty() {
            bail!("Cannot reject an empty URL");
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO rejected_images (url, reason, rejected_at)
             VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER))",
            params![url, reason],
        )?;
        Ok(inserted > 0)
    }

    /// Lift a rejection. Returns false if the URL was not rejected.
    pub fn restore(&self, url: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM rejected_images WHERE url = ?1", [url.trim()])?;
        Ok(deleted > 0)
    }

    pub fn get(&self, url: &str) -> Result<Option<RejectedImage>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, reason, rejected_at FROM rejected_images WHERE url = ?1",
                [url.trim()],
                |row| {
                    Ok(RejectedImage {
                        url: row.get(0)?,
                        reason: row.get(1)?,
                        rejected_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// All rejections, newest first.
    pub fn list(&self) -> Result<Vec<RejectedImage>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, reason, rejected_at FROM rejected_images \
             ORDER BY rejected_at DESC, url",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RejectedImage {
                    url: row.get(0)?,
                    reason: row.get(1)?,
                    rejected_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Snapshot for one batch.
    pub fn load(&self) -> Result<RejectionSet> {
        let mut stmt = self.conn.prepare("SELECT url FROM rejected_images")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(urls.into_iter().collect())
    }
}
