//! RSA client identity handed to the device at the end of registration.

use dpt_core::error::{CryptoError, ParseError, Result};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Modulus size of the client key.
pub const RSA_KEY_BITS: usize = 2048;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// The client's long-term RSA key pair.
///
/// The device stores the public half against the client id; the private half
/// authenticates later API sessions together with the issued certificate.
pub struct ClientIdentity {
    private_key: RsaPrivateKey,
    public_key_pem: String,
}

impl ClientIdentity {
    /// Generate a new RSA-2048 key pair.
    pub fn generate() -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private_key(private_key)
    }

    /// Load an existing PKCS#8 PEM private key.
    pub fn from_private_key_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Self::from_private_key(private_key)
    }

    fn from_private_key(private_key: RsaPrivateKey) -> Result<Self> {
        let public_key_pem = RsaPublicKey::from(&private_key)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Ok(Self {
            private_key,
            public_key_pem,
        })
    }

    /// SubjectPublicKeyInfo PEM, as sent to the device.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// PKCS#8 PEM of the private key.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()).into())
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("public_key_pem", &self.public_key_pem)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Random client identifier (UUID v4, hyphenated lowercase).
pub fn new_client_id() -> String {
    Uuid::new_v4().to_string()
}

/// Turn the certificate bytes unwrapped from the CA response into PEM text.
///
/// PEM input is returned unchanged once it parses as a certificate; anything
/// else is treated as DER and armoured.
pub fn normalize_certificate(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(ParseError::InvalidCertificate("empty certificate".to_string()).into());
    }

    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    if bytes[start..].starts_with(b"-----BEGIN") {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ParseError::InvalidCertificate(e.to_string()))?;
        let parsed =
            pem::parse(text).map_err(|e| ParseError::InvalidCertificate(e.to_string()))?;
        if parsed.tag() != CERTIFICATE_LABEL {
            return Err(ParseError::InvalidCertificate(format!(
                "unexpected PEM label '{}'",
                parsed.tag()
            ))
            .into());
        }
        return Ok(text.to_string());
    }

    Ok(pem::encode(&pem::Pem::new(CERTIFICATE_LABEL, bytes.to_vec())))
}
