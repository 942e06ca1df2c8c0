//! # dpt-pairing
//!
//! Registration of a client with a Digital Paper device.
//!
//! This crate implements:
//! - The letter-keyed JSON messages of the registration port
//! - A sans-IO state machine verifying every transcript tag
//! - An async session driver with cleanup and cancellation
//! - Collaborator traits for transport, PIN input and key issuance

pub mod messages;
mod registration;
mod result;
mod session;
mod traits;

pub use registration::{FailureReason, Registration, RegistrationState};
pub use result::RegistrationResult;
pub use session::PairingSession;
pub use traits::{FixedPinHandler, IdentityIssuer, PairingHandler, RsaIdentityIssuer, Transport};
