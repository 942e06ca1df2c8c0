//! # dpt-crypto
//!
//! Cryptographic primitives for Digital Paper device registration.
//!
//! This crate provides:
//! - Diffie-Hellman over the RFC 3526 2048-bit MODP group
//! - PBKDF2-HMAC-SHA256 session key derivation
//! - HMAC-SHA256 transcript tags for each protocol step
//! - The AES-128-CBC + truncated HMAC key-wrap used on the wire
//! - RSA-2048 client identity generation and PEM handling
//!
//! All secret material is zeroized on drop.

pub mod dh;
pub mod identity;
pub mod kdf;
pub mod keys;
pub mod transcript;
pub mod wrap;

#[cfg(any(test, feature = "test-vectors"))]
pub mod test_vectors;

pub use dh::{DhKeyPair, DhParams};
pub use identity::ClientIdentity;
pub use keys::{SessionKeys, SharedSecret};
