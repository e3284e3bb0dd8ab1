//! # confab-store
//!
//! Local offline cache for the Confab client, backed by SQLite.
//!
//! Text message content is stored exactly as it travels on the wire
//! (ciphertext), so nothing at rest leaks plaintext.  The crate exposes
//! a synchronous [`Database`] handle wrapping a `rusqlite::Connection`
//! with typed CRUD helpers per table, plus an async [`Cache`] adapter
//! that layers change-notification streams on top and implements the
//! [`confab_shared::LocalCache`] seam.

pub mod cache;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod rooms;
pub mod users;

mod error;

pub use cache::Cache;
pub use database::Database;
pub use error::StoreError;
