//! CRUD operations for [`ChatRoom`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use confab_shared::types::{ChatRoom, RoomId, UserId};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Insert or replace a batch of rooms in one transaction.
    pub fn upsert_rooms(&self, rooms: &[ChatRoom]) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO chat_rooms (id, name, description, participants, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for room in rooms {
                let participants = serde_json::to_string(&room.participants)?;
                stmt.execute(params![
                    room.id.to_string(),
                    room.name,
                    room.description,
                    participants,
                    room.created_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All cached rooms, ordered by creation date ascending.
    pub fn list_rooms(&self) -> Result<Vec<ChatRoom>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, description, participants, created_at
             FROM chat_rooms
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map([], row_to_room)?;

        let mut rooms = Vec::new();
        for row in rows {
            rooms.push(row?);
        }
        Ok(rooms)
    }

    /// Delete every cached room.  Returns the number of rows removed.
    pub fn delete_all_rooms(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM chat_rooms", [])?)
    }
}

/// Map a `rusqlite::Row` to a [`ChatRoom`].
fn row_to_room(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRoom> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let participants_json: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let participants: Vec<UserId> = serde_json::from_str(&participants_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ChatRoom {
        id: RoomId(id),
        name,
        description,
        participants,
        created_at,
    })
}
