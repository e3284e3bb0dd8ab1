// Network adapters: the realtime transport socket and the HTTP client
// for the remote document/blob/account stores.

pub mod account;
pub mod config;
pub mod remote;
pub mod socket;

mod error;

pub use account::HttpAccountStore;
pub use config::{NetConfig, ReconnectPolicy};
pub use error::NetError;
pub use remote::HttpRemoteFeed;
pub use socket::RealtimeSocket;
