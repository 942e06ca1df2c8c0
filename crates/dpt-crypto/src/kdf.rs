//! PBKDF2-HMAC-SHA256 derivation of the session keys.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Iteration count fixed by the device firmware.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Length of the derived key material: auth key (32) + key-wrap key (16).
pub const DERIVED_KEY_LEN: usize = 48;

/// Build the PBKDF2 salt `nonce1 || mac || nonce2`.
pub fn session_salt(nonce1: &[u8], mac: &[u8], nonce2: &[u8]) -> Vec<u8> {
    let mut salt = Vec::with_capacity(nonce1.len() + mac.len() + nonce2.len());
    salt.extend_from_slice(nonce1);
    salt.extend_from_slice(mac);
    salt.extend_from_slice(nonce2);
    salt
}

/// Derive the 48-byte key material from the DH shared secret.
pub fn derive(shared_secret: &[u8], salt: &[u8]) -> Zeroizing<[u8; DERIVED_KEY_LEN]> {
    let mut okm = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    pbkdf2_hmac::<Sha256>(shared_secret, salt, PBKDF2_ITERATIONS, &mut okm[..]);
    okm
}
