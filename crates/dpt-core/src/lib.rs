//! # dpt-core
//!
//! Core types and error definitions shared across the Digital Paper pairing crates.
//!
//! This crate provides:
//! - The error taxonomy for a pairing session
//! - Pairing endpoint and protocol configuration
//! - Names for the protocol round trips

pub mod config;
pub mod error;
pub mod step;

pub use config::{EndpointConfig, Endpoints, HttpMethod, PairingConfig};
pub use error::{CryptoError, Error, ParseError, Result, TransportError, Violation};
pub use step::Step;
