/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Maximum realtime frame size in bytes (256 KiB)
pub const MAX_FRAME_SIZE: usize = 262_144;

/// Default base URL of the remote document store's HTTP API
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Default URL of the realtime transport endpoint
pub const DEFAULT_SOCKET_URL: &str = "ws://127.0.0.1:8080/chat";

/// Remote storage prefix for image attachments
pub const STORAGE_IMAGES_PATH: &str = "chat_images/";

/// Remote storage prefix for other file attachments
pub const STORAGE_FILES_PATH: &str = "chat_files/";

/// Key derivation context (BLAKE3) for the content cipher key
pub const KDF_CONTEXT_CONTENT_KEY: &str = "confab-content-key-v1";

/// Capacity of the broadcast channel fanning inbound realtime frames
/// out to per-room subscribers
pub const TRANSPORT_FANOUT_CAPACITY: usize = 256;

/// Capacity of per-room feed channels
pub const FEED_CHANNEL_CAPACITY: usize = 16;
