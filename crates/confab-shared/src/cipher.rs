//! Content cipher for text message bodies.
//!
//! Text content is encrypted with XChaCha20-Poly1305 before it leaves
//! the device (remote store, realtime socket, local cache all hold
//! ciphertext) and decrypted by the reconciliation engine right before
//! emission.  The string form is `base64(nonce || ciphertext)` with a
//! 24-byte nonce prepended, so the same construction can ride inside a
//! JSON string field.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::constants::{KDF_CONTEXT_CONTENT_KEY, NONCE_SIZE, SYMMETRIC_KEY_SIZE};
use crate::error::CipherError;

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

/// Symmetric cipher bound to one key epoch.
///
/// `decrypt(encrypt(x)) == x` holds for any valid input within the same
/// key epoch.  Callers are expected to fall back to the raw content on
/// decryption failure rather than fail a whole feed.
#[derive(Clone)]
pub struct ContentCipher {
    key: SymmetricKey,
}

impl ContentCipher {
    /// Build a cipher from raw key material.
    pub fn from_key(key: SymmetricKey) -> Self {
        Self { key }
    }

    /// Derive the key from a passphrase with BLAKE3 (domain-separated).
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_CONTENT_KEY);
        hasher.update(passphrase.as_bytes());
        let hash = hasher.finalize();
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        key.copy_from_slice(&hash.as_bytes()[..SYMMETRIC_KEY_SIZE]);
        Self { key }
    }

    /// Parse a 64-character hex string into the key.
    pub fn from_hex(hex_key: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| CipherError::InvalidKeyLength)?;
        if bytes.len() != SYMMETRIC_KEY_SIZE {
            return Err(CipherError::InvalidKeyLength);
        }
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        key.copy_from_slice(&bytes);
        Ok(Self { key })
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    // Returns base64(nonce || ciphertext), 24 bytes of nonce prepended.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let cipher = XChaCha20Poly1305::new(&self.key.into());
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(output))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let data = BASE64
            .decode(encoded)
            .map_err(|_| CipherError::DecryptionFailed)?;
        if data.len() < NONCE_SIZE {
            return Err(CipherError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let cipher = XChaCha20Poly1305::new(&self.key.into());
        let nonce = XNonce::from_slice(nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed)
    }
}

impl std::fmt::Debug for ContentCipher {
    // Never print key material.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCipher").finish_non_exhaustive()
    }
}
