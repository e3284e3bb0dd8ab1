//! CRUD operations for [`User`] records.
//!
//! The `is_current` column marks the device's authenticated identity;
//! at most one row carries it at a time.

use rusqlite::{params, OptionalExtension};

use confab_shared::types::{User, UserId};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Store the authenticated identity, demoting any previous one.
    pub fn save_current_user(&self, user: &User) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("UPDATE users SET is_current = 0 WHERE is_current = 1", [])?;
        tx.execute(
            "INSERT OR REPLACE INTO users (id, username, email, avatar_url, is_current)
             VALUES (?1, ?2, ?3, ?4, 1)",
            params![user.id.as_str(), user.username, user.email, user.avatar_url],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// The device's authenticated identity, if one is cached.
    pub fn get_current_user(&self) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, username, email, avatar_url
                 FROM users
                 WHERE is_current = 1",
                [],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Fetch a user by account id.
    pub fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, username, email, avatar_url
                 FROM users
                 WHERE id = ?1",
                params![id.as_str()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Delete every cached user.  Returns the number of rows removed.
    pub fn delete_all_users(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM users", [])?)
    }
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        avatar_url: row.get(3)?,
    })
}
