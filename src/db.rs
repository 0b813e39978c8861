use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ComicError, Result};
use crate::models::ArchiveEntry;

/// Bookmark table: one row per comic id, `id` is the primary key.
///
/// The connection sits behind a mutex so fetch workers on other threads can
/// read and write concurrently; sqlite serialises writes to the same id.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ComicError::StorageUnavailable(e.to_string()))?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bookmarks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ComicError::StorageUnavailable("Failed to lock database connection".into()))
    }

    /// Insert or replace; adding the same id twice leaves one row.
    pub fn add_bookmark(&self, id: &str, title: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO bookmarks (id, title) VALUES (?1, ?2)",
            params![id, title],
        )?;
        Ok(())
    }

    pub fn remove_bookmark(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn is_bookmarked(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bookmarks WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Every bookmark as an archive entry flagged `bookmarked`, ordered by id.
    pub fn get_all_bookmarks(&self) -> Result<Vec<ArchiveEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title FROM bookmarks
             ORDER BY length(id) ASC, id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ArchiveEntry {
                id: row.get(0)?,
                title: row.get(1)?,
                published: None,
                bookmarked: true,
            })
        })?;

        let mut bookmarks = Vec::new();
        for bookmark in rows {
            bookmarks.push(bookmark?);
        }

        Ok(bookmarks)
    }

    pub fn bookmarked_ids(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM bookmarks")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    #[cfg(test)]
    pub(crate) fn break_schema(&self) {
        let conn = self.conn.lock().unwrap();
        conn.execute("DROP TABLE bookmarks", []).unwrap();
    }
}
