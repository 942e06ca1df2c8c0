//! Diffie-Hellman over the RFC 3526 2048-bit MODP group (group 14).
//!
//! The device accepts exactly one encoding for the client public value: 257
//! bytes, big-endian, with a leading zero byte. Its own contribution may
//! arrive with or without that byte and is projected to 256 bytes.

use crate::keys::SharedSecret;
use dpt_core::error::{Error, Result};
use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Prime size in bytes (2048 bits).
pub const PRIME_BYTES: usize = 256;

/// Encoded client public value size (sign byte + prime size).
pub const PUBLIC_KEY_BYTES: usize = PRIME_BYTES + 1;

/// Private exponent size in bytes (256 bits).
const PRIVATE_BYTES: usize = 32;

/// RFC 3526 2048-bit MODP prime as hex string.
const RFC3526_P_2048: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AACAA68FFFFFFFFFFFFFFFF"
);

/// Group parameters.
pub struct DhParams {
    /// Safe prime p.
    pub p: BigUint,
    /// Generator g (always 2).
    pub g: BigUint,
    /// Subgroup order q = (p - 1) / 2.
    pub q: BigUint,
}

impl Default for DhParams {
    fn default() -> Self {
        let p = BigUint::parse_bytes(RFC3526_P_2048.as_bytes(), 16)
            .expect("Invalid RFC 3526 prime constant");
        let g = BigUint::from(2u32);
        let q = (&p - 1u32) >> 1;
        Self { p, g, q }
    }
}

impl DhParams {
    /// NIST SP 800-56A safe-prime check of a peer public value.
    ///
    /// Requires `2 <= y <= p - 2` and `y^q mod p == 1`, which rejects the
    /// trivial values and anything outside the prime-order subgroup.
    pub fn validate_peer(&self, y: &BigUint) -> Result<()> {
        let two = BigUint::from(2u32);
        if y < &two || y > &(&self.p - 2u32) {
            return Err(Error::InvalidPeerKey("out of range [2, p-2]"));
        }
        if y.modpow(&self.q, &self.p) != BigUint::from(1u32) {
            return Err(Error::InvalidPeerKey("not in prime-order subgroup"));
        }
        Ok(())
    }
}

/// Ephemeral DH key pair owned by a single registration.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DhKeyPair {
    #[zeroize(skip)]
    params: DhParams,
    private_key: Vec<u8>,
    #[zeroize(skip)]
    public_key: BigUint,
}

impl DhKeyPair {
    /// Generate a key pair with a fresh 256-bit private exponent.
    pub fn generate() -> Self {
        let mut exponent = Zeroizing::new([0u8; PRIVATE_BYTES]);
        OsRng.fill_bytes(&mut exponent[..]);
        Self::from_private_key(&exponent[..])
    }

    /// Build a key pair from a big-endian private exponent.
    pub fn from_private_key(private_key: &[u8]) -> Self {
        let params = DhParams::default();
        // BigUint has no zeroizing drop; its copies of the exponent only live
        // for the duration of one modpow.
        let public_key = params.g.modpow(&BigUint::from_bytes_be(private_key), &params.p);
        Self {
            params,
            private_key: private_key.to_vec(),
            public_key,
        }
    }

    /// Public value g^x mod p in the device's 257-byte encoding.
    pub fn public_key(&self) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(PUBLIC_KEY_BYTES);
        encoded.push(0);
        encoded.extend_from_slice(&pad_to_prime(&self.public_key));
        encoded
    }

    /// Validate the peer value and compute the 256-byte shared secret.
    pub fn shared_secret(&self, peer_public: &[u8]) -> Result<SharedSecret> {
        let projected = project_peer_key(peer_public)?;
        let y = BigUint::from_bytes_be(&projected);
        self.params.validate_peer(&y)?;

        // Only the padded byte form of z is wiped; the BigUint is dropped here.
        let z = y.modpow(&BigUint::from_bytes_be(&self.private_key), &self.params.p);
        Ok(SharedSecret::new(pad_to_prime(&z)))
    }

    /// Group parameters.
    pub fn params(&self) -> &DhParams {
        &self.params
    }
}

/// Project a peer contribution onto exactly [`PRIME_BYTES`] bytes.
///
/// Longer inputs may only carry zero bytes in front (sign bytes); shorter
/// inputs are left-padded.
pub fn project_peer_key(peer_public: &[u8]) -> Result<Vec<u8>> {
    if peer_public.len() > PRIME_BYTES {
        let (head, tail) = peer_public.split_at(peer_public.len() - PRIME_BYTES);
        if head.iter().any(|&b| b != 0) {
            return Err(Error::InvalidPeerKey("value wider than 2048 bits"));
        }
        return Ok(tail.to_vec());
    }
    let mut padded = vec![0u8; PRIME_BYTES - peer_public.len()];
    padded.extend_from_slice(peer_public);
    Ok(padded)
}

/// Pad BigUint to PRIME_BYTES with leading zeros.
fn pad_to_prime(value: &BigUint) -> Vec<u8> {
    let bytes = Zeroizing::new(value.to_bytes_be());
    if bytes.len() >= PRIME_BYTES {
        bytes[bytes.len() - PRIME_BYTES..].to_vec()
    } else {
        let mut padded = vec![0u8; PRIME_BYTES - bytes.len()];
        padded.extend_from_slice(&bytes);
        padded
    }
}
