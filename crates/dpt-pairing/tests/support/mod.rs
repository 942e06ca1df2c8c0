//! Scripted Digital Paper device for driving full registrations.

#![allow(dead_code)]

use async_trait::async_trait;
use dpt_core::error::{Error, Result, TransportError};
use dpt_crypto::dh::DhKeyPair;
use dpt_crypto::identity::ClientIdentity;
use dpt_crypto::keys::SessionKeys;
use dpt_crypto::transcript::{self, Tag};
use dpt_crypto::wrap;
use dpt_pairing::messages::{
    CaRequest, CaResponse, HashRequest, HashResponse, Nonce, PinChallenge, RegistrationRequest,
    WireMessage,
};
use dpt_pairing::{IdentityIssuer, PairingHandler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

pub const DEVICE_PIN: &str = "4821";

pub const DEVICE_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----\n\
    MIIBszCCAVmgAwIBAgIUZGlnaXRhbHBhcGVydGVzdGNlcnQwCgYIKoZIzj0EAwIw\n\
    EjEQMA4GA1UEAwwHRFBULVJQMTAeFw0yNjEwMTgwMDAwMDBaFw0zNjEwMTgwMDAw\n\
    -----END CERTIFICATE-----\n";

const DEVICE_SECRET: [u8; 16] = [0xe5; 16];

/// What the device saw of the client's final registration.
#[derive(Debug, Clone)]
pub struct Registered {
    pub client_id: String,
    pub public_key_pem: String,
}

/// Transcript state of the current attempt.
struct Attempt {
    key_pair: DhKeyPair,
    nonce1: Nonce,
    mac: Vec<u8>,
    keys: Option<SessionKeys>,
    nonce2: Nonce,
    ya: Vec<u8>,
    e_hash: Tag,
    m3: Tag,
    wrapped_es_cert: Vec<u8>,
    m5: Tag,
}

/// Device side of the protocol behind the [`dpt_pairing::Transport`] seam.
pub struct FakeDevice {
    pin: String,
    certificate: Vec<u8>,
    wrong_nonce2: bool,
    stall_at: Option<&'static str>,
    attempt: Option<Attempt>,
    /// `METHOD path` of every request, in order.
    pub calls: Vec<String>,
    /// Whether the client's rHash matched the device PIN.
    pub r_hash_valid: Option<bool>,
    pub registered: Option<Registered>,
}

impl FakeDevice {
    pub fn new(pin: &str) -> Self {
        Self {
            pin: pin.to_string(),
            certificate: DEVICE_CERTIFICATE.as_bytes().to_vec(),
            wrong_nonce2: false,
            stall_at: None,
            attempt: None,
            calls: Vec::new(),
            r_hash_valid: None,
            registered: None,
        }
    }

    /// Echo a different nonce2 in the hash response.
    pub fn with_wrong_nonce2(mut self) -> Self {
        self.wrong_nonce2 = true;
        self
    }

    /// Certificate bytes placed after `es` in the CA response.
    pub fn with_certificate(mut self, certificate: &[u8]) -> Self {
        self.certificate = certificate.to_vec();
        self
    }

    /// Never answer requests to `path`.
    pub fn stall_at(mut self, path: &'static str) -> Self {
        self.stall_at = Some(path);
        self
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }

    fn attempt(&mut self) -> Result<&mut Attempt> {
        self.attempt
            .as_mut()
            .ok_or_else(|| TransportError::Status(400).into())
    }

    fn pin_challenge(&mut self) -> Result<Vec<u8>> {
        let attempt = Attempt {
            key_pair: DhKeyPair::generate(),
            nonce1: device_nonce(),
            mac: vec![0xac, 0x89, 0x95, 0xf7, 0xf8, 0x99],
            keys: None,
            nonce2: [0; 16],
            ya: Vec::new(),
            e_hash: [0; 32],
            m3: [0; 32],
            wrapped_es_cert: Vec::new(),
            m5: [0; 32],
        };
        let body = PinChallenge {
            nonce1: attempt.nonce1,
            mac: attempt.mac.clone(),
            other_contribution: attempt.key_pair.public_key(),
        }
        .to_json();
        self.attempt = Some(attempt);
        body
    }

    fn hash(&mut self, body: &[u8]) -> Result<Vec<u8>> {
        let pin = self.pin.clone();
        let wrong_nonce2 = self.wrong_nonce2;
        let attempt = self.attempt()?;
        let request = HashRequest::from_json(body)?;

        let shared = attempt.key_pair.shared_secret(&request.public_key)?;
        let keys = SessionKeys::derive(&shared, &attempt.nonce1, &attempt.mac, &request.nonce2);
        let ak = *keys.auth_key();
        let yb = attempt.key_pair.public_key()[1..].to_vec();

        let h2 = transcript::h2(
            &ak,
            &attempt.nonce1,
            &attempt.mac,
            &yb,
            &request.nonce2,
            &request.public_key,
        );
        if !transcript::verify(&h2, &request.h2) {
            return Err(TransportError::Status(401).into());
        }

        let psk = transcript::psk(&ak, &pin);
        attempt.e_hash = transcript::e_hash(&ak, &DEVICE_SECRET, &psk[..], &yb, &request.public_key);
        attempt.m3 = transcript::m3(
            &ak,
            &attempt.nonce1,
            &request.nonce2,
            &attempt.mac,
            &request.public_key,
            &h2,
            &attempt.e_hash,
        );
        attempt.nonce2 = request.nonce2;
        attempt.ya = request.public_key;
        attempt.keys = Some(keys);

        let mut nonce2 = attempt.nonce2;
        if wrong_nonce2 {
            nonce2[0] ^= 0xff;
        }
        HashResponse {
            nonce2,
            e_hash: attempt.e_hash,
            m3: attempt.m3,
        }
        .to_json()
    }

    fn ca(&mut self, body: &[u8]) -> Result<Vec<u8>> {
        let pin = self.pin.clone();
        let certificate = self.certificate.clone();
        let attempt = self.attempt()?;
        let request = CaRequest::from_json(body)?;
        let keys = attempt
            .keys
            .as_ref()
            .ok_or(Error::Transport(TransportError::Status(400)))?;
        let ak = keys.auth_key();

        let m4 = transcript::m4(
            ak,
            &attempt.nonce2,
            &attempt.e_hash,
            &attempt.m3,
            &attempt.nonce1,
            &request.r_hash,
            &request.wrapped_rs,
        );
        if !transcript::verify(&m4, &request.m4) {
            return Err(TransportError::Status(401).into());
        }

        let rs = wrap::unwrap(&request.wrapped_rs, keys)?;
        let yb = attempt.key_pair.public_key()[1..].to_vec();
        let psk = transcript::psk(ak, &pin);
        let expected = transcript::r_hash(ak, &rs, &psk[..], &yb, &attempt.ya);
        let r_hash_valid = transcript::verify(&expected, &request.r_hash);

        let payload = [&DEVICE_SECRET[..], &certificate[..]].concat();
        attempt.wrapped_es_cert = wrap::wrap(&payload, keys)?;
        attempt.m5 = transcript::m5(
            ak,
            &attempt.nonce1,
            &request.r_hash,
            &request.wrapped_rs,
            &request.m4,
            &attempt.nonce2,
            &attempt.wrapped_es_cert,
        );

        let body = CaResponse {
            nonce2: attempt.nonce2,
            wrapped_es_cert: attempt.wrapped_es_cert.clone(),
            m5: attempt.m5,
        }
        .to_json();
        self.r_hash_valid = Some(r_hash_valid);
        body
    }

    fn register(&mut self, body: &[u8]) -> Result<Vec<u8>> {
        let attempt = self.attempt()?;
        let request = RegistrationRequest::from_json(body)?;
        let keys = attempt
            .keys
            .as_ref()
            .ok_or(Error::Transport(TransportError::Status(400)))?;

        let m6 = transcript::m6(
            keys.auth_key(),
            &attempt.nonce2,
            &attempt.wrapped_es_cert,
            &attempt.m5,
            &attempt.nonce1,
            &request.wrapped,
        );
        if !transcript::verify(&m6, &request.m6) {
            return Err(TransportError::Status(401).into());
        }

        let payload = wrap::unwrap(&request.wrapped, keys)?;
        let text = String::from_utf8(payload.to_vec())
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let (client_id, public_key_pem) = text.split_at(36);
        self.registered = Some(Registered {
            client_id: client_id.to_string(),
            public_key_pem: public_key_pem.to_string(),
        });
        Ok(Vec::new())
    }

    fn dispatch(&mut self, method: &str, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        match (method, path) {
            ("PUT", "/register/cleanup") => {
                self.attempt = None;
                Ok(Vec::new())
            }
            ("POST", "/register/pin") => self.pin_challenge(),
            ("POST", "/register/hash") => self.hash(body),
            ("POST", "/register/ca") => self.ca(body),
            ("POST", "/register") => self.register(body),
            _ => Err(TransportError::Status(404).into()),
        }
    }

    async fn handle(&mut self, method: &str, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.calls.push(format!("{} {}", method, path));
        if self.stall_at == Some(path) {
            std::future::pending::<()>().await;
        }
        self.dispatch(method, path, body)
    }
}

#[async_trait]
impl dpt_pairing::Transport for FakeDevice {
    async fn get(&mut self, path: &str) -> Result<Vec<u8>> {
        self.handle("GET", path, &[]).await
    }

    async fn post(&mut self, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.handle("POST", path, body).await
    }

    async fn put(&mut self, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.handle("PUT", path, body).await
    }
}

fn device_nonce() -> Nonce {
    let mut nonce = [0u8; 16];
    for (i, b) in nonce.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(37).wrapping_add(11);
    }
    nonce
}

/// Handler that types a fixed PIN and counts prompts.
#[derive(Clone, Default)]
pub struct PinPrompt {
    pin: String,
    pub prompts: Arc<AtomicUsize>,
}

impl PinPrompt {
    pub fn new(pin: &str) -> Self {
        Self {
            pin: pin.to_string(),
            prompts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PairingHandler for PinPrompt {
    fn on_pin_required(&self) -> String {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.pin.clone()
    }
}

/// Issues one pre-generated RSA key per test binary and counts requests.
#[derive(Clone, Default)]
pub struct CountingIssuer {
    pub issued: Arc<AtomicUsize>,
}

impl CountingIssuer {
    pub fn count(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

impl IdentityIssuer for CountingIssuer {
    fn issue(&self) -> Result<ClientIdentity> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        ClientIdentity::from_private_key_pem(shared_private_key_pem())
    }
}

fn shared_private_key_pem() -> &'static str {
    static PEM: OnceLock<String> = OnceLock::new();
    PEM.get_or_init(|| {
        let identity = ClientIdentity::generate().expect("RSA key generation");
        identity
            .private_key_pem()
            .expect("PKCS#8 encoding")
            .to_string()
    })
}
