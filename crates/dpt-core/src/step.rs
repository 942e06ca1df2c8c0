//! Round trips of the registration protocol.

use std::fmt;

/// One request/response exchange with the device's pairing port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Reset of any half-finished registration on the device.
    Cleanup,
    /// Device shows a PIN and returns its DH contribution.
    PinRequest,
    /// Client sends its DH public value, device answers with the PIN commitment.
    HashExchange,
    /// Client proves the PIN, device returns its wrapped CA-issued certificate.
    CaRegistration,
    /// Client hands over its identifier and public key.
    DeviceRegistration,
}

impl Step {
    /// Short name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Cleanup => "cleanup",
            Step::PinRequest => "pin_request",
            Step::HashExchange => "hash_exchange",
            Step::CaRegistration => "ca_registration",
            Step::DeviceRegistration => "device_registration",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
