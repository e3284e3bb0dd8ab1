//! Message reconciliation engine.
//!
//! Merges three message sources per room (remote push subscription,
//! realtime socket, local cache) into one deduplicated, time-ordered,
//! decrypted feed, and fans writes out to the same three collaborators.

pub mod engine;
pub mod error;
pub mod merge;
pub mod rooms;
pub mod session;
pub mod telemetry;

pub use engine::{RoomFeed, SyncEngine};
pub use error::{StatusUpdateError, SyncError};
pub use rooms::{RoomDirectory, RoomListFeed};
pub use session::SessionManager;
