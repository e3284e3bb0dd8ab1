//! # confab-shared
//!
//! Domain types and seam traits shared by every Confab crate: the
//! message/room/user models, the content cipher applied to text bodies,
//! and the adapter traits (`RemoteFeed`, `RealtimeTransport`,
//! `LocalCache`, `AccountStore`) that the reconciliation engine is
//! constructed from.

pub mod adapters;
pub mod cipher;
pub mod constants;
pub mod error;
pub mod types;

pub use adapters::{AccountStore, LocalCache, RealtimeTransport, RemoteFeed};
pub use cipher::ContentCipher;
pub use error::{AdapterError, CipherError};
pub use types::*;
