//! Schema migrations.
//!
//! Every connection constructor runs the pending migrations before
//! handing the database out.  `PRAGMA user_version` records how far a
//! given file has been migrated, so each step applies exactly once.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Version the schema is at after all migrations below have run.
/// A schema change means a new module plus a bump here.
const CURRENT_VERSION: u32 = 1;

/// Bring the connected database up to [`CURRENT_VERSION`], applying
/// whatever steps its recorded `user_version` still lacks.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::info!(
        from_version = current,
        to_version = CURRENT_VERSION,
        "running cache schema migrations"
    );

    if current < 1 {
        tracing::info!("applying migration v001_initial");
        v001_initial::up(conn).map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}
