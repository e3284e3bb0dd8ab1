//! Adapter seam traits.
//!
//! The reconciliation engine is constructed from these four traits
//! (dependency injection via constructor, no ambient singletons).
//! Live sequences are plain `tokio::mpsc` receivers: dropping the
//! receiver cancels the subscription and releases the underlying
//! listener.  Inbound realtime frames fan out over a broadcast channel
//! so every room subscription independently observes every frame.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::error::AdapterError;
use crate::types::{
    ChatRoom, ConnectionState, Message, MessageId, MessageStatus, MessageType, RoomId, User,
    UserId,
};

/// Subscription-based mirror of the remote authoritative store.
#[async_trait]
pub trait RemoteFeed: Send + Sync {
    /// Live sequence of full message snapshots for one room, ordered by
    /// timestamp ascending.  A subscription error closes the channel;
    /// it never panics the consumer.
    fn observe_messages(&self, room_id: RoomId) -> mpsc::Receiver<Vec<Message>>;

    /// Persist a new message.  Single request, no built-in retry.
    async fn send_message(&self, message: &Message) -> Result<(), AdapterError>;

    /// Overwrite the status field of an existing message.
    async fn update_message_status(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<(), AdapterError>;

    /// Upload a local file to the blob store, returning its durable URL.
    async fn upload_file(&self, path: &Path, kind: MessageType) -> Result<String, AdapterError>;

    /// Live sequence of full room-list snapshots.
    fn observe_rooms(&self) -> mpsc::Receiver<Vec<ChatRoom>>;

    /// Create a room document.
    async fn create_room(&self, room: &ChatRoom) -> Result<(), AdapterError>;
}

/// Persistent duplex connection delivering newly created messages with
/// at-least-once, best-effort semantics and no historical replay.
///
/// The connection is process-scoped and shared across all rooms.
pub trait RealtimeTransport: Send + Sync {
    /// Subscribe to inbound message frames.  Broadcast semantics: every
    /// subscriber observes every frame.
    fn subscribe(&self) -> broadcast::Receiver<Message>;

    /// Push a message frame.  Fire-and-forget; silently dropped when
    /// the connection is not open.
    fn send_message(&self, message: &Message);

    /// Current connection lifecycle state.
    fn state(&self) -> ConnectionState;
}

/// Durable key-ordered store of users, rooms and messages on the device.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn upsert_messages(&self, messages: &[Message]) -> Result<(), AdapterError>;

    /// Live sequence of the cached message list for one room, emitting
    /// the current list immediately and again after every change.
    fn observe_messages(&self, room_id: RoomId) -> mpsc::Receiver<Vec<Message>>;

    /// Replace only the `status` field of the addressed message within
    /// the correct room.
    async fn update_message_status(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<(), AdapterError>;

    async fn upsert_rooms(&self, rooms: &[ChatRoom]) -> Result<(), AdapterError>;

    /// Live sequence of the cached room list.
    fn observe_rooms(&self) -> mpsc::Receiver<Vec<ChatRoom>>;

    /// Cached room list, one shot.
    async fn rooms(&self) -> Result<Vec<ChatRoom>, AdapterError>;

    /// Erase every cached table (logout).
    async fn clear_all(&self) -> Result<(), AdapterError>;

    /// Store the authenticated identity, replacing any previous one.
    async fn save_user(&self, user: &User) -> Result<(), AdapterError>;

    /// The device's authenticated identity, if any.
    async fn current_user(&self) -> Result<Option<User>, AdapterError>;

    async fn user_by_id(&self, id: &UserId) -> Result<Option<User>, AdapterError>;
}

/// Authoritative account store (out-of-scope collaborator, interface only).
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<User, AdapterError>;

    async fn login(&self, email: &str, password: &str) -> Result<User, AdapterError>;

    async fn logout(&self) -> Result<(), AdapterError>;

    /// Opaque id of the currently authenticated identity, or `None`.
    async fn current_identity(&self) -> Result<Option<UserId>, AdapterError>;

    async fn user_by_id(&self, id: &UserId) -> Result<Option<User>, AdapterError>;
}
