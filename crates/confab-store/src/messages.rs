//! CRUD operations for [`Message`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;

use confab_shared::types::{Message, MessageId, MessageStatus, MessageType, RoomId, UserId};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Insert or replace a batch of messages in one transaction.
    ///
    /// Replacement keyed on the message id makes repeated delivery of the
    /// same message (remote snapshot + realtime frame) harmless.
    pub fn upsert_messages(&self, messages: &[Message]) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO messages
                     (id, room_id, sender_id, content, timestamp, type, file_url, file_name, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for message in messages {
                stmt.execute(params![
                    message.id.to_string(),
                    message.room_id.to_string(),
                    message.sender_id.as_str(),
                    message.content,
                    message.timestamp.to_rfc3339(),
                    message.kind.as_str(),
                    message.file_url,
                    message.file_name,
                    message.status.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All cached messages of one room, ordered by timestamp ascending.
    pub fn get_messages_for_room(&self, room_id: RoomId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, room_id, sender_id, content, timestamp, type, file_url, file_name, status
             FROM messages
             WHERE room_id = ?1
             ORDER BY timestamp ASC",
        )?;

        let rows = stmt.query_map(params![room_id.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Replace only the `status` column of the addressed message.
    ///
    /// The lookup is keyed on message id *within the given room*; a
    /// message id that exists under a different room is not touched and
    /// reports [`StoreError::NotFound`].
    pub fn update_message_status(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE messages SET status = ?1 WHERE id = ?2 AND room_id = ?3",
            params![
                status.as_str(),
                message_id.to_string(),
                room_id.to_string()
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Delete every cached message.  Returns the number of rows removed.
    pub fn delete_all_messages(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM messages", [])?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let room_id_str: String = row.get(1)?;
    let sender_id: String = row.get(2)?;
    let content: String = row.get(3)?;
    let ts_str: String = row.get(4)?;
    let kind_str: String = row.get(5)?;
    let file_url: Option<String> = row.get(6)?;
    let file_name: Option<String> = row.get(7)?;
    let status_str: String = row.get(8)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_err(0, e))?;
    let room_id = Uuid::parse_str(&room_id_str).map_err(|e| conversion_err(1, e))?;

    let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(4, e))?;

    let kind: MessageType = kind_str
        .parse()
        .map_err(|e: String| conversion_err(5, StringError(e)))?;
    let status: MessageStatus = status_str
        .parse()
        .map_err(|e: String| conversion_err(8, StringError(e)))?;

    Ok(Message {
        id: MessageId(id),
        room_id: RoomId(room_id),
        sender_id: UserId(sender_id),
        content,
        timestamp,
        kind,
        file_url,
        file_name,
        status,
    })
}

fn conversion_err(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

#[derive(Debug)]
struct StringError(String);

impl std::fmt::Display for StringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StringError {}
