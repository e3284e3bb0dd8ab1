//! Domain model structs shared by the remote feed, the realtime
//! transport and the local cache.
//!
//! Wire encoding matches the remote store's JSON documents: camelCase
//! field names, SCREAMING enum values. Every struct derives `Serialize`
//! and `Deserialize` so the same type flows through all three sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Client-generated unique message identifier; the deduplication key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque account identifier assigned by the authoritative account store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Message kind.  Decides whether the body is cipher-protected (TEXT)
/// and whether `file_url` / `file_name` are populated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::File => "FILE",
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEXT" => Ok(Self::Text),
            "IMAGE" => Ok(Self::Image),
            "FILE" => Ok(Self::File),
            other => Err(format!("unknown message type: {other}")),
        }
    }
}

/// Delivery state of a message.  Intended to only ever move forward
/// (SENT -> DELIVERED -> READ); the merge enforces this with
/// [`MessageStatus::rank`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Monotonic ordering rank: SENT < DELIVERED < READ.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Sent => 0,
            Self::Delivered => 1,
            Self::Read => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Delivered => "DELIVERED",
            Self::Read => "READ",
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SENT" => Ok(Self::Sent),
            "DELIVERED" => Ok(Self::Delivered),
            "READ" => Ok(Self::Read),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}

/// Lifecycle of the realtime transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
    Closed,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.  Immutable once created except for `status`.
///
/// For `Text` messages the `content` field carries ciphertext everywhere
/// outside the reconciliation engine; the engine decrypts immediately
/// before handing messages to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier, generated client-side at creation.
    pub id: MessageId,
    /// The room this message belongs to.
    pub room_id: RoomId,
    /// Account id of the author.
    pub sender_id: UserId,
    /// Text body (ciphertext for TEXT) or attachment placeholder.
    pub content: String,
    /// Creation time; the sole sort key within a room.
    pub timestamp: DateTime<Utc>,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Download URL of the attachment, when `kind != Text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Original file name of the attachment, when `kind != Text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Delivery state.
    pub status: MessageStatus,
}

impl Message {
    /// Build a new plaintext text message stamped with the current time.
    pub fn text(room_id: RoomId, sender_id: impl Into<UserId>, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            room_id,
            sender_id: sender_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            kind: MessageType::Text,
            file_url: None,
            file_name: None,
            status: MessageStatus::Sent,
        }
    }

    /// Build a new attachment message pointing at an uploaded file.
    pub fn attachment(
        room_id: RoomId,
        sender_id: impl Into<UserId>,
        kind: MessageType,
        file_url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            id: MessageId::new(),
            room_id,
            sender_id: sender_id.into(),
            content: format!("File: {file_name}"),
            timestamp: Utc::now(),
            kind,
            file_url: Some(file_url.into()),
            file_name: Some(file_name),
            status: MessageStatus::Sent,
        }
    }
}

// ---------------------------------------------------------------------------
// ChatRoom
// ---------------------------------------------------------------------------

/// A named channel owning an ordered sequence of messages.  Created once,
/// never mutated or deleted by this core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    /// Stable, client-generated identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Participant account ids; insertion order is irrelevant.
    #[serde(default)]
    pub participants: Vec<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        participants: Vec<UserId>,
    ) -> Self {
        Self {
            id: RoomId::new(),
            name: name.into(),
            description,
            participants,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An account identity.  Exactly one `User` record represents the
/// device's authenticated identity at a time; it is replaced wholesale
/// on login and erased on logout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_encoding() {
        let msg = Message::text(RoomId::new(), "u1", "hola");
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"roomId\""));
        assert!(json.contains("\"senderId\""));
        assert!(json.contains("\"type\":\"TEXT\""));
        assert!(json.contains("\"status\":\"SENT\""));
        // No attachment fields on a text message.
        assert!(!json.contains("fileUrl"));

        let restored: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, msg);
    }

    #[test]
    fn test_attachment_content_placeholder() {
        let msg = Message::attachment(
            RoomId::new(),
            "u1",
            MessageType::Image,
            "https://blobs/abc",
            "photo.png",
        );
        assert_eq!(msg.content, "File: photo.png");
        assert_eq!(msg.file_name.as_deref(), Some("photo.png"));
    }

    #[test]
    fn test_status_rank_order() {
        assert!(MessageStatus::Sent.rank() < MessageStatus::Delivered.rank());
        assert!(MessageStatus::Delivered.rank() < MessageStatus::Read.rank());
    }

    #[test]
    fn test_enum_round_trip_strings() {
        for status in [
            MessageStatus::Sent,
            MessageStatus::Delivered,
            MessageStatus::Read,
        ] {
            assert_eq!(status.as_str().parse::<MessageStatus>().unwrap(), status);
        }
        for kind in [MessageType::Text, MessageType::Image, MessageType::File] {
            assert_eq!(kind.as_str().parse::<MessageType>().unwrap(), kind);
        }
    }
}
