//! Session key types.

use crate::kdf;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Auth key length (HMAC-SHA256 key for the rest of the session).
pub const AUTH_KEY_LEN: usize = 32;

/// Key-wrap key length (AES-128).
pub const KEY_WRAP_KEY_LEN: usize = 16;

/// DH shared secret, always 256 bytes for group 14.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Create from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED; {}])", self.0.len())
    }
}

/// The two symmetric keys of a registration session.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    auth_key: [u8; AUTH_KEY_LEN],
    key_wrap_key: [u8; KEY_WRAP_KEY_LEN],
}

impl SessionKeys {
    /// Build from explicit key bytes.
    pub fn new(auth_key: [u8; AUTH_KEY_LEN], key_wrap_key: [u8; KEY_WRAP_KEY_LEN]) -> Self {
        Self {
            auth_key,
            key_wrap_key,
        }
    }

    /// Derive both keys from the shared secret and the exchanged nonces.
    ///
    /// The first 32 bytes of PBKDF2 output are the auth key, the next 16 the
    /// key-wrap key.
    pub fn derive(shared_secret: &SharedSecret, nonce1: &[u8], mac: &[u8], nonce2: &[u8]) -> Self {
        let salt = kdf::session_salt(nonce1, mac, nonce2);
        let okm = kdf::derive(shared_secret.as_bytes(), &salt);

        let mut auth_key = [0u8; AUTH_KEY_LEN];
        auth_key.copy_from_slice(&okm[..AUTH_KEY_LEN]);
        let mut key_wrap_key = [0u8; KEY_WRAP_KEY_LEN];
        key_wrap_key.copy_from_slice(&okm[AUTH_KEY_LEN..]);

        Self {
            auth_key,
            key_wrap_key,
        }
    }

    /// HMAC key for transcript tags and wrap tags.
    pub fn auth_key(&self) -> &[u8; AUTH_KEY_LEN] {
        &self.auth_key
    }

    /// AES-128 key for the key wrap.
    pub fn key_wrap_key(&self) -> &[u8; KEY_WRAP_KEY_LEN] {
        &self.key_wrap_key
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys([REDACTED])")
    }
}
