//! Credentials produced by a successful registration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything a client needs to authenticate against the device afterwards.
///
/// Nothing here is persisted by this crate; hand it to whatever stores the
/// client's credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResult {
    /// Device-issued client certificate, PEM.
    pub certificate: String,
    /// Client RSA private key, PKCS#8 PEM.
    pub private_key: String,
    /// Identifier the device registered the public key under.
    pub client_id: String,
}

impl fmt::Debug for RegistrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationResult")
            .field("certificate", &self.certificate)
            .field("private_key", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .finish()
    }
}
