//! SQLite connection handle for the local cache.
//!
//! [`Database`] owns the `rusqlite::Connection`; every constructor runs
//! the schema migrations, so a handle is always at the current schema.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Handle over the cache database.  All table helpers hang off this.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the cache at its default location, inside the
    /// platform data directory:
    /// - Linux:   `~/.local/share/confab/confab.db`
    /// - macOS:   `~/Library/Application Support/com.confab.confab/confab.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\confab\confab\data\confab.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "confab", "confab").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("confab.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) the cache at an explicit path, for callers that
    /// manage their own directory layout.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL keeps observers readable while the engine writes through.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Open a throwaway in-memory database (tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// The raw connection, for transactions and ad-hoc queries the
    /// typed helpers do not cover.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Filesystem path of the open database, `None` when in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Erase every cached table.  Used on logout.
    pub fn clear_all(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM messages", [])?;
        tx.execute("DELETE FROM chat_rooms", [])?;
        tx.execute("DELETE FROM users", [])?;
        tx.commit()?;
        tracing::info!("local cache cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
    }

    #[test]
    fn clear_all_on_empty_db() {
        let db = Database::open_in_memory().unwrap();
        db.clear_all().expect("clearing an empty cache is fine");
    }
}
