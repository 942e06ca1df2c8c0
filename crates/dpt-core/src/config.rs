//! Pairing endpoint configuration.
//!
//! The defaults describe the DPT-RP1 firmware family: an unsecured HTTP
//! registration service on port 8080, next to the TLS API on 8443.

use serde::{Deserialize, Serialize};

/// Default registration port.
pub const DEFAULT_PAIRING_PORT: u16 = 8080;

/// Default length of the device secret `es` that prefixes the certificate
/// in the unwrapped CA response.
pub const DEFAULT_ES_LEN: usize = 16;

/// HTTP verb used for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

/// One endpoint on the registration service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Path appended to the base URL.
    pub path: String,
    pub method: HttpMethod,
}

impl EndpointConfig {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }
}

/// All endpoints used by a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub cleanup: EndpointConfig,
    pub pin: EndpointConfig,
    pub hash: EndpointConfig,
    pub ca: EndpointConfig,
    pub register: EndpointConfig,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cleanup: EndpointConfig::new(HttpMethod::Put, "/register/cleanup"),
            pin: EndpointConfig::new(HttpMethod::Post, "/register/pin"),
            hash: EndpointConfig::new(HttpMethod::Post, "/register/hash"),
            ca: EndpointConfig::new(HttpMethod::Post, "/register/ca"),
            register: EndpointConfig::new(HttpMethod::Post, "/register"),
        }
    }
}

/// Configuration for a pairing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Port of the registration service.
    pub port: u16,
    pub endpoints: Endpoints,
    /// Split point between `es` and the certificate in the CA response.
    ///
    /// Only observed as 16 on a single firmware family, hence configurable.
    pub es_len: usize,
    /// Call the cleanup endpoint again once registration finished.
    pub cleanup_after: bool,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PAIRING_PORT,
            endpoints: Endpoints::default(),
            es_len: DEFAULT_ES_LEN,
            cleanup_after: true,
        }
    }
}

impl PairingConfig {
    /// Base URL of the registration service on `host`.
    pub fn base_url(&self, host: &str) -> String {
        format!("http://{}:{}", host, self.port)
    }

    /// Set the registration port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replace the endpoint table.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the `es` length used to split the CA response.
    pub fn with_es_len(mut self, es_len: usize) -> Self {
        self.es_len = es_len;
        self
    }

    /// Enable or disable the trailing cleanup call.
    pub fn with_cleanup_after(mut self, enabled: bool) -> Self {
        self.cleanup_after = enabled;
        self
    }
}
