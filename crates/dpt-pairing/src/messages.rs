//! JSON wire messages of the registration protocol.
//!
//! Bodies are flat objects keyed by single letters with standard base64
//! values. The letter meaning depends on the message:
//!
//! | message               | a      | b     | c      | d             | e  |
//! |-----------------------|--------|-------|--------|---------------|----|
//! | `PinChallenge`        | nonce1 | mac   | yb     |               |    |
//! | `HashRequest`         | nonce1 | nonce2| mac    | ya            | h2 |
//! | `HashResponse`        | nonce2 | eHash |        |               | m3 |
//! | `CaRequest`           | nonce1 | rHash |        | wrapped rs    | m4 |
//! | `CaResponse`          | nonce2 |       |        | wrapped es+cert | m5 |
//! | `RegistrationRequest` | nonce1 |       |        | wrapped id+key | m6 |
//!
//! Letters only exist at this boundary; the rest of the crate works with the
//! typed structs below.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dpt_core::error::{ParseError, Result};
use dpt_crypto::transcript::{Tag, TAG_LEN};
use serde::{Deserialize, Serialize};

/// Length of both protocol nonces.
pub const NONCE_LEN: usize = 16;

/// A protocol nonce.
pub type Nonce = [u8; NONCE_LEN];

/// Letter-keyed JSON object. Unknown letters are ignored on input.
#[doc(hidden)]
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WireFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    b: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    e: Option<String>,
}

impl WireFields {
    fn bytes(&self, message: &'static str, field: &'static str) -> Result<Vec<u8>> {
        let value = match field {
            "a" => &self.a,
            "b" => &self.b,
            "c" => &self.c,
            "d" => &self.d,
            _ => &self.e,
        };
        let value = value
            .as_deref()
            .ok_or(ParseError::MissingField { message, field })?;
        Ok(BASE64
            .decode(value)
            .map_err(|_| ParseError::InvalidBase64(field))?)
    }

    fn fixed<const N: usize>(&self, message: &'static str, field: &'static str) -> Result<[u8; N]> {
        let bytes = self.bytes(message, field)?;
        let actual = bytes.len();
        Ok(bytes.try_into().map_err(|_| ParseError::InvalidLength {
            field,
            expected: N,
            actual,
        })?)
    }
}

fn encode(bytes: &[u8]) -> Option<String> {
    Some(BASE64.encode(bytes))
}

/// A message that can cross the JSON boundary.
pub trait WireMessage: Sized {
    /// Name used in parse errors.
    const NAME: &'static str;

    #[doc(hidden)]
    fn to_fields(&self) -> WireFields;

    #[doc(hidden)]
    fn from_fields(fields: WireFields) -> Result<Self>;

    /// Serialize to a JSON body.
    fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.to_fields())
            .map_err(|e| ParseError::Json(e.to_string()).into())
    }

    /// Parse a JSON body.
    fn from_json(body: &[u8]) -> Result<Self> {
        let fields: WireFields =
            serde_json::from_slice(body).map_err(|e| ParseError::Json(e.to_string()))?;
        Self::from_fields(fields)
    }
}

/// Device's reply to the PIN request. The device shows the PIN at the same
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinChallenge {
    pub nonce1: Nonce,
    pub mac: Vec<u8>,
    /// Device DH contribution as sent, before projection.
    pub other_contribution: Vec<u8>,
}

impl WireMessage for PinChallenge {
    const NAME: &'static str = "PinChallenge";

    fn to_fields(&self) -> WireFields {
        WireFields {
            a: encode(&self.nonce1),
            b: encode(&self.mac),
            c: encode(&self.other_contribution),
            ..Default::default()
        }
    }

    fn from_fields(f: WireFields) -> Result<Self> {
        Ok(Self {
            nonce1: f.fixed(Self::NAME, "a")?,
            mac: f.bytes(Self::NAME, "b")?,
            other_contribution: f.bytes(Self::NAME, "c")?,
        })
    }
}

/// Client DH public value plus the first transcript tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRequest {
    pub nonce1: Nonce,
    pub nonce2: Nonce,
    pub mac: Vec<u8>,
    /// 257-byte client public value.
    pub public_key: Vec<u8>,
    pub h2: Tag,
}

impl WireMessage for HashRequest {
    const NAME: &'static str = "HashRequest";

    fn to_fields(&self) -> WireFields {
        WireFields {
            a: encode(&self.nonce1),
            b: encode(&self.nonce2),
            c: encode(&self.mac),
            d: encode(&self.public_key),
            e: encode(&self.h2),
        }
    }

    fn from_fields(f: WireFields) -> Result<Self> {
        Ok(Self {
            nonce1: f.fixed(Self::NAME, "a")?,
            nonce2: f.fixed(Self::NAME, "b")?,
            mac: f.bytes(Self::NAME, "c")?,
            public_key: f.bytes(Self::NAME, "d")?,
            h2: f.fixed::<TAG_LEN>(Self::NAME, "e")?,
        })
    }
}

/// Device's PIN commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashResponse {
    pub nonce2: Nonce,
    pub e_hash: Tag,
    pub m3: Tag,
}

impl WireMessage for HashResponse {
    const NAME: &'static str = "HashResponse";

    fn to_fields(&self) -> WireFields {
        WireFields {
            a: encode(&self.nonce2),
            b: encode(&self.e_hash),
            e: encode(&self.m3),
            ..Default::default()
        }
    }

    fn from_fields(f: WireFields) -> Result<Self> {
        Ok(Self {
            nonce2: f.fixed(Self::NAME, "a")?,
            e_hash: f.fixed(Self::NAME, "b")?,
            m3: f.fixed(Self::NAME, "e")?,
        })
    }
}

/// Client PIN commitment and its wrapped secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaRequest {
    pub nonce1: Nonce,
    pub r_hash: Tag,
    pub wrapped_rs: Vec<u8>,
    pub m4: Tag,
}

impl WireMessage for CaRequest {
    const NAME: &'static str = "CaRequest";

    fn to_fields(&self) -> WireFields {
        WireFields {
            a: encode(&self.nonce1),
            b: encode(&self.r_hash),
            d: encode(&self.wrapped_rs),
            e: encode(&self.m4),
            ..Default::default()
        }
    }

    fn from_fields(f: WireFields) -> Result<Self> {
        Ok(Self {
            nonce1: f.fixed(Self::NAME, "a")?,
            r_hash: f.fixed(Self::NAME, "b")?,
            wrapped_rs: f.bytes(Self::NAME, "d")?,
            m4: f.fixed(Self::NAME, "e")?,
        })
    }
}

/// Device secret and certificate, wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaResponse {
    pub nonce2: Nonce,
    pub wrapped_es_cert: Vec<u8>,
    pub m5: Tag,
}

impl WireMessage for CaResponse {
    const NAME: &'static str = "CaResponse";

    fn to_fields(&self) -> WireFields {
        WireFields {
            a: encode(&self.nonce2),
            d: encode(&self.wrapped_es_cert),
            e: encode(&self.m5),
            ..Default::default()
        }
    }

    fn from_fields(f: WireFields) -> Result<Self> {
        Ok(Self {
            nonce2: f.fixed(Self::NAME, "a")?,
            wrapped_es_cert: f.bytes(Self::NAME, "d")?,
            m5: f.fixed(Self::NAME, "e")?,
        })
    }
}

/// Wrapped client id and public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub nonce1: Nonce,
    pub wrapped: Vec<u8>,
    pub m6: Tag,
}

impl WireMessage for RegistrationRequest {
    const NAME: &'static str = "RegistrationRequest";

    fn to_fields(&self) -> WireFields {
        WireFields {
            a: encode(&self.nonce1),
            d: encode(&self.wrapped),
            e: encode(&self.m6),
            ..Default::default()
        }
    }

    fn from_fields(f: WireFields) -> Result<Self> {
        Ok(Self {
            nonce1: f.fixed(Self::NAME, "a")?,
            wrapped: f.bytes(Self::NAME, "d")?,
            m6: f.fixed(Self::NAME, "e")?,
        })
    }
}
