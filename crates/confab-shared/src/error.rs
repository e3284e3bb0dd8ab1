use thiserror::Error;

/// Content cipher failures.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Invalid key length")]
    InvalidKeyLength,
}

/// Error surfaced across the adapter seams ([`crate::RemoteFeed`],
/// [`crate::LocalCache`], [`crate::AccountStore`]).
///
/// Each adapter crate maps its own error type into this one so the
/// engine reports failures uniformly regardless of which collaborator
/// produced them.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The collaborator could not be reached (network down, connection
    /// refused, subscription dropped).
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered but refused the operation.
    #[error("Operation rejected: {0}")]
    Rejected(String),

    /// The addressed record does not exist.
    #[error("Record not found")]
    NotFound,

    /// The caller supplied an argument the operation cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Local I/O failure (reading an attachment, touching the database
    /// file).
    #[error("IO error: {0}")]
    Io(String),
}
