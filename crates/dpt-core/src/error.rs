//! Error types for Digital Paper pairing.

use crate::step::Step;
use thiserror::Error;

/// Primary error type for all pairing operations.
///
/// Every variant is fatal to the session that produced it. Nonces and derived
/// keys are single-use, so a caller that wants to try again has to start a new
/// session from the PIN request.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid peer DH public value: {0}")]
    InvalidPeerKey(&'static str),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] Violation),

    #[error("Integrity check failed on unwrapped data")]
    IntegrityCheckFailed,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid pairing state: {0}")]
    InvalidState(String),

    #[error("Pairing cancelled")]
    Cancelled,
}

impl Error {
    /// True when the device rejected the PIN the user typed.
    ///
    /// This is the only failure a UI should present as "start over and enter
    /// the new PIN"; everything else points at a broken or hostile peer.
    pub fn is_pin_rejected(&self) -> bool {
        matches!(self, Error::ProtocolViolation(Violation::PinProofFailed))
    }
}

/// Transcript checks that can fail during the handshake.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    #[error("nonce returned by device does not match at {step}")]
    NonceMismatch { step: Step },

    #[error("transcript HMAC does not match at {step}")]
    TagMismatch { step: Step },

    #[error("PIN proof failed (wrong PIN or tampered exchange)")]
    PinProofFailed,
}

/// Failures reported by the transport collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Local cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Key encoding failed: {0}")]
    KeyEncoding(String),
}

/// Malformed messages from the device.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid JSON body: {0}")]
    Json(String),

    #[error("Missing required field '{field}' in {message}")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    #[error("Invalid base64 in field '{0}'")]
    InvalidBase64(&'static str),

    #[error("Field '{field}' has length {actual}, expected {expected}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
