//! Registration state machine (steps 2 to 9 of the handshake).
//!
//! `Registration` never touches the network. The session driver feeds it
//! response bodies and sends the request bodies it produces, which keeps every
//! check here testable without a transport.
//!
//! Any error moves the machine to `Failed` and drops the session keys.
//! Instances are single-use.

use crate::messages::{
    CaRequest, CaResponse, HashRequest, HashResponse, Nonce, PinChallenge, RegistrationRequest,
    WireMessage, NONCE_LEN,
};
use crate::result::RegistrationResult;
use dpt_core::config::PairingConfig;
use dpt_core::error::{Error, ParseError, Result, Violation};
use dpt_core::step::Step;
use dpt_crypto::dh::{project_peer_key, DhKeyPair};
use dpt_crypto::identity::{normalize_certificate, ClientIdentity};
use dpt_crypto::keys::SessionKeys;
use dpt_crypto::transcript::{self, Tag};
use dpt_crypto::wrap;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

/// Length of the client's random secret `rs`.
const RS_LEN: usize = 16;

/// Progress of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Init,
    /// PIN is on the device screen, hash request built.
    PinRequested,
    /// Device commitment verified, session keys confirmed.
    KeyExchanged,
    /// PIN proven, certificate unwrapped.
    CaVerified,
    /// Device accepted the client key.
    DeviceRegistered,
    Done,
    Failed(FailureReason),
}

impl RegistrationState {
    /// True for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationState::Done | RegistrationState::Failed(_))
    }
}

/// Why a registration ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Transport,
    InvalidPeerKey,
    ProtocolViolation(Violation),
    IntegrityCheckFailed,
    Crypto,
    Parse,
    InvalidState,
    Cancelled,
}

impl From<&Error> for FailureReason {
    fn from(error: &Error) -> Self {
        match error {
            Error::Transport(_) => FailureReason::Transport,
            Error::InvalidPeerKey(_) => FailureReason::InvalidPeerKey,
            Error::ProtocolViolation(violation) => FailureReason::ProtocolViolation(*violation),
            Error::IntegrityCheckFailed => FailureReason::IntegrityCheckFailed,
            Error::Crypto(_) => FailureReason::Crypto,
            Error::Parse(_) => FailureReason::Parse,
            Error::InvalidState(_) => FailureReason::InvalidState,
            Error::Cancelled => FailureReason::Cancelled,
        }
    }
}

/// Values fixed once the DH exchange is done.
struct Exchange {
    keys: SessionKeys,
    nonce1: Nonce,
    nonce2: Nonce,
    mac: Vec<u8>,
    /// Client public value, 257 bytes.
    ya: Vec<u8>,
    /// Device contribution projected to 256 bytes.
    yb: Vec<u8>,
    h2: Tag,
    commitment: Option<Commitment>,
    proof: Option<ClientProof>,
    device: Option<DeviceReply>,
}

/// Verified hash response.
struct Commitment {
    e_hash: Tag,
    m3: Tag,
}

/// What the client sent in its CA request.
struct ClientProof {
    psk: Zeroizing<Tag>,
    r_hash: Tag,
    wrapped_rs: Vec<u8>,
    m4: Tag,
}

/// Verified CA response.
struct DeviceReply {
    wrapped_es_cert: Vec<u8>,
    m5: Tag,
}

/// One registration attempt.
pub struct Registration {
    state: RegistrationState,
    es_len: usize,
    exchange: Option<Exchange>,
    certificate: Option<String>,
    client_id: Option<String>,
    identity: Option<ClientIdentity>,
}

impl Registration {
    /// Create a registration using the `es` split length from `config`.
    pub fn new(config: &PairingConfig) -> Self {
        Self {
            state: RegistrationState::Init,
            es_len: config.es_len,
            exchange: None,
            certificate: None,
            client_id: None,
            identity: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// True once the result was handed out.
    pub fn is_complete(&self) -> bool {
        self.state == RegistrationState::Done
    }

    /// Move to `Failed` and drop all session secrets.
    ///
    /// Terminal states are left as they are.
    pub fn abort(&mut self, reason: FailureReason) {
        if !self.state.is_terminal() {
            self.state = RegistrationState::Failed(reason);
        }
        self.exchange = None;
        self.identity = None;
    }

    /// Process the PIN challenge and build the hash request.
    ///
    /// Generates the client DH key pair and `nonce2`, derives the session
    /// keys and computes tag h2.
    pub fn start_key_exchange(&mut self, pin_challenge: &[u8]) -> Result<Vec<u8>> {
        let mut nonce2 = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce2);
        self.start_key_exchange_with(pin_challenge, DhKeyPair::generate(), nonce2)
    }

    pub(crate) fn start_key_exchange_with(
        &mut self,
        pin_challenge: &[u8],
        key_pair: DhKeyPair,
        nonce2: Nonce,
    ) -> Result<Vec<u8>> {
        let result = self.key_exchange(pin_challenge, key_pair, nonce2);
        self.track(result)
    }

    fn key_exchange(
        &mut self,
        pin_challenge: &[u8],
        key_pair: DhKeyPair,
        nonce2: Nonce,
    ) -> Result<Vec<u8>> {
        self.require(
            RegistrationState::Init,
            "PIN challenge can only be processed from Init",
        )?;

        let challenge = PinChallenge::from_json(pin_challenge)?;
        debug!(
            contribution_len = challenge.other_contribution.len(),
            mac_len = challenge.mac.len(),
            "Received PIN challenge"
        );

        let yb = project_peer_key(&challenge.other_contribution)?;
        let shared_secret = key_pair.shared_secret(&yb)?;
        let ya = key_pair.public_key();
        drop(key_pair);

        let keys = SessionKeys::derive(&shared_secret, &challenge.nonce1, &challenge.mac, &nonce2);
        let h2 = transcript::h2(
            keys.auth_key(),
            &challenge.nonce1,
            &challenge.mac,
            &yb,
            &nonce2,
            &ya,
        );

        let body = HashRequest {
            nonce1: challenge.nonce1,
            nonce2,
            mac: challenge.mac.clone(),
            public_key: ya.clone(),
            h2,
        }
        .to_json()?;

        debug!(
            public_key_prefix = %hex::encode(&ya[..8]),
            peer_prefix = %hex::encode(&yb[..8]),
            "Session keys derived"
        );

        self.exchange = Some(Exchange {
            keys,
            nonce1: challenge.nonce1,
            nonce2,
            mac: challenge.mac,
            ya,
            yb,
            h2,
            commitment: None,
            proof: None,
            device: None,
        });
        self.state = RegistrationState::PinRequested;
        Ok(body)
    }

    /// Verify the hash response: echoed `nonce2` and tag m3.
    pub fn process_hash_response(&mut self, body: &[u8]) -> Result<()> {
        let result = self.hash_response(body);
        self.track(result)
    }

    fn hash_response(&mut self, body: &[u8]) -> Result<()> {
        self.require(
            RegistrationState::PinRequested,
            "hash response can only be processed after the PIN challenge",
        )?;

        let response = HashResponse::from_json(body)?;
        let exchange = self.exchange.as_mut().ok_or_else(missing_exchange)?;

        if response.nonce2 != exchange.nonce2 {
            return Err(Violation::NonceMismatch {
                step: Step::HashExchange,
            }
            .into());
        }

        let expected = transcript::m3(
            exchange.keys.auth_key(),
            &exchange.nonce1,
            &exchange.nonce2,
            &exchange.mac,
            &exchange.ya,
            &exchange.h2,
            &response.e_hash,
        );
        if !transcript::verify(&expected, &response.m3) {
            return Err(Violation::TagMismatch {
                step: Step::HashExchange,
            }
            .into());
        }

        exchange.commitment = Some(Commitment {
            e_hash: response.e_hash,
            m3: response.m3,
        });
        self.state = RegistrationState::KeyExchanged;
        Ok(())
    }

    /// Bind the PIN and build the CA request.
    pub fn build_ca_request(&mut self, pin: &str) -> Result<Vec<u8>> {
        let result = self.ca_request(pin);
        self.track(result)
    }

    fn ca_request(&mut self, pin: &str) -> Result<Vec<u8>> {
        self.require(
            RegistrationState::KeyExchanged,
            "CA request can only be built after the key exchange",
        )?;

        let exchange = self.exchange.as_mut().ok_or_else(missing_exchange)?;
        if exchange.proof.is_some() {
            return Err(Error::InvalidState("CA request already built".to_string()));
        }
        let commitment = exchange.commitment.as_ref().ok_or_else(missing_exchange)?;
        let auth_key = exchange.keys.auth_key();

        let psk = transcript::psk(auth_key, pin);
        let mut rs = Zeroizing::new([0u8; RS_LEN]);
        OsRng.fill_bytes(&mut rs[..]);

        let r_hash = transcript::r_hash(
            auth_key,
            &rs[..],
            &psk[..],
            &exchange.yb,
            &exchange.ya,
        );
        let wrapped_rs = wrap::wrap(&rs[..], &exchange.keys)?;
        let m4 = transcript::m4(
            auth_key,
            &exchange.nonce2,
            &commitment.e_hash,
            &commitment.m3,
            &exchange.nonce1,
            &r_hash,
            &wrapped_rs,
        );

        let body = CaRequest {
            nonce1: exchange.nonce1,
            r_hash,
            wrapped_rs: wrapped_rs.clone(),
            m4,
        }
        .to_json()?;

        exchange.proof = Some(ClientProof {
            psk,
            r_hash,
            wrapped_rs,
            m4,
        });
        Ok(body)
    }

    /// Verify the CA response and the device's PIN commitment.
    ///
    /// Checks `nonce2`, tag m5, the wrap integrity tag and finally eHash.
    /// Only the last check depends on the PIN, so only it yields
    /// [`Violation::PinProofFailed`].
    pub fn process_ca_response(&mut self, body: &[u8]) -> Result<()> {
        let result = self.ca_response(body);
        self.track(result)
    }

    fn ca_response(&mut self, body: &[u8]) -> Result<()> {
        self.require(
            RegistrationState::KeyExchanged,
            "CA response can only be processed after the key exchange",
        )?;

        let es_len = self.es_len;
        let exchange = self.exchange.as_mut().ok_or_else(missing_exchange)?;
        let commitment = exchange.commitment.as_ref().ok_or_else(missing_exchange)?;
        let proof = exchange.proof.as_ref().ok_or_else(|| {
            Error::InvalidState("CA response received before the CA request".to_string())
        })?;
        let auth_key = exchange.keys.auth_key();

        let response = CaResponse::from_json(body)?;

        if response.nonce2 != exchange.nonce2 {
            return Err(Violation::NonceMismatch {
                step: Step::CaRegistration,
            }
            .into());
        }

        let expected = transcript::m5(
            auth_key,
            &exchange.nonce1,
            &proof.r_hash,
            &proof.wrapped_rs,
            &proof.m4,
            &exchange.nonce2,
            &response.wrapped_es_cert,
        );
        if !transcript::verify(&expected, &response.m5) {
            return Err(Violation::TagMismatch {
                step: Step::CaRegistration,
            }
            .into());
        }

        let es_cert = wrap::unwrap(&response.wrapped_es_cert, &exchange.keys)?;
        if es_cert.len() <= es_len {
            return Err(ParseError::InvalidCertificate(format!(
                "CA payload of {} bytes leaves no room after the {}-byte device secret",
                es_cert.len(),
                es_len
            ))
            .into());
        }
        let (es, certificate) = es_cert.split_at(es_len);

        let expected_e_hash = transcript::e_hash(
            auth_key,
            es,
            &proof.psk[..],
            &exchange.yb,
            &exchange.ya,
        );
        if !transcript::verify(&expected_e_hash, &commitment.e_hash) {
            return Err(Violation::PinProofFailed.into());
        }

        let certificate = normalize_certificate(certificate)?;
        debug!(certificate_len = certificate.len(), "Device certificate unwrapped");

        exchange.device = Some(DeviceReply {
            wrapped_es_cert: response.wrapped_es_cert,
            m5: response.m5,
        });
        self.certificate = Some(certificate);
        self.state = RegistrationState::CaVerified;
        Ok(())
    }

    /// Build the final registration request carrying `client_id` and the
    /// identity's public key.
    pub fn build_registration_request(
        &mut self,
        client_id: &str,
        identity: ClientIdentity,
    ) -> Result<Vec<u8>> {
        let result = self.registration_request(client_id, identity);
        self.track(result)
    }

    fn registration_request(&mut self, client_id: &str, identity: ClientIdentity) -> Result<Vec<u8>> {
        self.require(
            RegistrationState::CaVerified,
            "registration request can only be built after the CA step",
        )?;
        if self.identity.is_some() {
            return Err(Error::InvalidState(
                "registration request already built".to_string(),
            ));
        }

        let exchange = self.exchange.as_ref().ok_or_else(missing_exchange)?;
        let device = exchange.device.as_ref().ok_or_else(missing_exchange)?;

        let public_key_pem = identity.public_key_pem();
        let mut payload = Vec::with_capacity(client_id.len() + public_key_pem.len());
        payload.extend_from_slice(client_id.as_bytes());
        payload.extend_from_slice(public_key_pem.as_bytes());

        let wrapped = wrap::wrap(&payload, &exchange.keys)?;
        let m6 = transcript::m6(
            exchange.keys.auth_key(),
            &exchange.nonce2,
            &device.wrapped_es_cert,
            &device.m5,
            &exchange.nonce1,
            &wrapped,
        );

        let body = RegistrationRequest {
            nonce1: exchange.nonce1,
            wrapped,
            m6,
        }
        .to_json()?;

        self.client_id = Some(client_id.to_string());
        self.identity = Some(identity);
        Ok(body)
    }

    /// Record the device's acknowledgement of the registration request.
    ///
    /// The session keys are no longer needed afterwards and are dropped.
    pub fn confirm_registration(&mut self) -> Result<()> {
        let result = self.registration_confirmed();
        self.track(result)
    }

    fn registration_confirmed(&mut self) -> Result<()> {
        self.require(
            RegistrationState::CaVerified,
            "registration can only be confirmed after the CA step",
        )?;
        if self.identity.is_none() {
            return Err(Error::InvalidState(
                "registration confirmed before the request was built".to_string(),
            ));
        }
        self.exchange = None;
        self.state = RegistrationState::DeviceRegistered;
        Ok(())
    }

    /// Hand out the credentials.
    pub fn finish(&mut self) -> Result<RegistrationResult> {
        let result = self.finished();
        self.track(result)
    }

    fn finished(&mut self) -> Result<RegistrationResult> {
        self.require(
            RegistrationState::DeviceRegistered,
            "result is only available once the device registered the client",
        )?;

        let identity = self.identity.take().ok_or_else(missing_exchange)?;
        let private_key = identity.private_key_pem()?;
        let result = RegistrationResult {
            certificate: self.certificate.take().ok_or_else(missing_exchange)?,
            private_key: private_key.as_str().to_owned(),
            client_id: self.client_id.take().ok_or_else(missing_exchange)?,
        };

        self.state = RegistrationState::Done;
        Ok(result)
    }

    fn require(&self, expected: RegistrationState, message: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState(format!(
                "{} (current state: {:?})",
                message, self.state
            )));
        }
        Ok(())
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            self.abort(FailureReason::from(error));
        }
        result
    }
}

fn missing_exchange() -> Error {
    Error::InvalidState("registration data missing for current state".to_string())
}
