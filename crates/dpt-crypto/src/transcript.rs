//! HMAC-SHA256 transcript tags.
//!
//! Every message after the PIN request carries a tag over a fixed ordering of
//! previously exchanged fields. The orderings are reproduced byte for byte
//! from the device firmware; the duplicated nonces and the asymmetric
//! ordering of the two DH contributions are deliberate.
//!
//! Naming follows the device's point of view: `ya` is the client's 257-byte
//! public value, `yb` the device's contribution projected to 256 bytes.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Output length of every tag.
pub const TAG_LEN: usize = 32;

/// A transcript tag.
pub type Tag = [u8; TAG_LEN];

/// HMAC-SHA256 over the concatenation of `fields`.
pub fn tag(auth_key: &[u8], fields: &[&[u8]]) -> Tag {
    let mut mac = HmacSha256::new_from_slice(auth_key).expect("HMAC can take key of any size");
    for field in fields {
        mac.update(field);
    }
    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Constant-time comparison of a received tag against the recomputed one.
pub fn verify(expected: &Tag, received: &[u8]) -> bool {
    expected.as_slice().ct_eq(received).into()
}

/// PIN-derived pre-shared key, `HMAC(authKey, pin)`.
pub fn psk(auth_key: &[u8], pin: &str) -> Zeroizing<Tag> {
    Zeroizing::new(tag(auth_key, &[pin.as_bytes()]))
}

/// Client's PIN commitment over its random secret `rs`.
pub fn r_hash(auth_key: &[u8], rs: &[u8], psk: &[u8], yb: &[u8], ya: &[u8]) -> Tag {
    tag(auth_key, &[rs, psk, yb, ya])
}

/// Device's PIN commitment over its secret `es`.
///
/// The device sends this before the client reveals anything PIN-dependent;
/// recomputing it after unwrapping `es` is the PIN proof.
pub fn e_hash(auth_key: &[u8], es: &[u8], psk: &[u8], yb: &[u8], ya: &[u8]) -> Tag {
    tag(auth_key, &[es, psk, yb, ya])
}

/// Tag sent with the hash request.
pub fn h2(auth_key: &[u8], nonce1: &[u8], mac: &[u8], yb: &[u8], nonce2: &[u8], ya: &[u8]) -> Tag {
    tag(auth_key, &[nonce1, mac, yb, nonce1, nonce2, mac, ya])
}

/// Tag expected on the hash response.
pub fn m3(
    auth_key: &[u8],
    nonce1: &[u8],
    nonce2: &[u8],
    mac: &[u8],
    ya: &[u8],
    h2: &[u8],
    e_hash: &[u8],
) -> Tag {
    tag(auth_key, &[nonce1, nonce2, mac, ya, h2, nonce2, e_hash])
}

/// Tag sent with the CA request.
pub fn m4(
    auth_key: &[u8],
    nonce2: &[u8],
    e_hash: &[u8],
    m3: &[u8],
    nonce1: &[u8],
    r_hash: &[u8],
    wrapped_rs: &[u8],
) -> Tag {
    tag(auth_key, &[nonce2, e_hash, m3, nonce1, r_hash, wrapped_rs])
}

/// Tag expected on the CA response.
pub fn m5(
    auth_key: &[u8],
    nonce1: &[u8],
    r_hash: &[u8],
    wrapped_rs: &[u8],
    m4: &[u8],
    nonce2: &[u8],
    wrapped_es_cert: &[u8],
) -> Tag {
    tag(auth_key, &[nonce1, r_hash, wrapped_rs, m4, nonce2, wrapped_es_cert])
}

/// Tag sent with the final registration.
pub fn m6(
    auth_key: &[u8],
    nonce2: &[u8],
    wrapped_es_cert: &[u8],
    m5: &[u8],
    nonce1: &[u8],
    wrapped_registration: &[u8],
) -> Tag {
    tag(auth_key, &[nonce2, wrapped_es_cert, m5, nonce1, wrapped_registration])
}
