//! Collaborator traits: transport, user interaction and key issuance.

use crate::registration::RegistrationState;
use async_trait::async_trait;
use dpt_core::error::{Error, Result};
use dpt_crypto::identity::ClientIdentity;
use tracing::debug;

/// HTTP transport to the device's registration port.
///
/// Paths are relative to the registration base URL. Implementations map
/// non-2xx replies to `TransportError::Status` and own timeouts and retries.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// GET `path`, returning the response body.
    async fn get(&mut self, path: &str) -> Result<Vec<u8>>;

    /// POST a JSON body to `path`.
    async fn post(&mut self, path: &str, body: &[u8]) -> Result<Vec<u8>>;

    /// PUT a JSON body to `path`.
    async fn put(&mut self, path: &str, body: &[u8]) -> Result<Vec<u8>>;
}

/// Handler for pairing state changes.
pub trait PairingHandler: Send + Sync {
    /// Called when the PIN shown on the device screen is needed.
    ///
    /// May block; the session moves the call off the async worker.
    fn on_pin_required(&self) -> String;

    /// Called when pairing starts.
    fn on_pairing_started(&self) {}

    /// Called after every state transition.
    fn on_state_changed(&self, _state: &RegistrationState) {}

    /// Called when pairing completes successfully.
    fn on_pairing_complete(&self) {}

    /// Called when pairing fails or is cancelled.
    fn on_pairing_failed(&self, _error: &Error) {}
}

/// Handler that answers with a fixed PIN.
pub struct FixedPinHandler {
    pin: String,
}

impl FixedPinHandler {
    pub fn new(pin: impl Into<String>) -> Self {
        Self { pin: pin.into() }
    }
}

impl PairingHandler for FixedPinHandler {
    fn on_pin_required(&self) -> String {
        self.pin.clone()
    }
}

/// Source of the client key pair registered with the device.
pub trait IdentityIssuer: Send + Sync {
    fn issue(&self) -> Result<ClientIdentity>;
}

/// Issues a fresh RSA-2048 identity per registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct RsaIdentityIssuer;

impl IdentityIssuer for RsaIdentityIssuer {
    fn issue(&self) -> Result<ClientIdentity> {
        debug!("Generating RSA-2048 client key");
        ClientIdentity::generate()
    }
}
