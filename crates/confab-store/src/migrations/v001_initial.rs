//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `users`, `chat_rooms` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY NOT NULL,   -- opaque account id
    username   TEXT NOT NULL,
    email      TEXT NOT NULL,
    avatar_url TEXT,
    is_current INTEGER NOT NULL DEFAULT 0   -- boolean: the device identity
);

-- ----------------------------------------------------------------
-- Chat rooms
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_rooms (
    id           TEXT PRIMARY KEY NOT NULL, -- UUID v4
    name         TEXT NOT NULL,
    description  TEXT,
    participants TEXT NOT NULL,             -- JSON array of user ids
    created_at   TEXT NOT NULL              -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id        TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    room_id   TEXT NOT NULL,                -- FK -> chat_rooms(id)
    sender_id TEXT NOT NULL,
    content   TEXT NOT NULL,                -- ciphertext for TEXT messages
    timestamp TEXT NOT NULL,                -- ISO-8601
    type      TEXT NOT NULL,                -- TEXT | IMAGE | FILE
    file_url  TEXT,
    file_name TEXT,
    status    TEXT NOT NULL                 -- SENT | DELIVERED | READ
);

CREATE INDEX IF NOT EXISTS idx_messages_room_ts
    ON messages(room_id, timestamp ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
