//! Authenticated key wrap used for every secret the two sides exchange.
//!
//! Layout on the wire is `AES-128-CBC(data || tag8) || iv` with PKCS#7
//! padding, where `tag8` is the first eight bytes of `HMAC-SHA256(authKey,
//! data)`. The IV trails the ciphertext.

use crate::keys::SessionKeys;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use dpt_core::error::{CryptoError, Error, Result};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES block and IV length.
pub const IV_LEN: usize = 16;

/// Length of the truncated integrity tag.
pub const WRAP_TAG_LEN: usize = 8;

/// Wrap `data` under a fresh random IV.
pub fn wrap(data: &[u8], keys: &SessionKeys) -> Result<Vec<u8>> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    wrap_with_iv(data, keys, &iv)
}

/// Wrap `data` with a caller-chosen IV.
pub(crate) fn wrap_with_iv(data: &[u8], keys: &SessionKeys, iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
    let mut plaintext = Zeroizing::new(Vec::with_capacity(data.len() + WRAP_TAG_LEN));
    plaintext.extend_from_slice(data);
    plaintext.extend_from_slice(&wrap_tag(keys.auth_key(), data));

    let cipher = Aes128CbcEnc::new_from_slices(keys.key_wrap_key(), iv)
        .map_err(|e| CryptoError::Encryption(format!("Invalid key or IV: {}", e)))?;

    let mut blob = cipher.encrypt_padded_vec_mut::<Pkcs7>(&plaintext);
    blob.extend_from_slice(iv);
    Ok(blob)
}

/// Reverse [`wrap`].
///
/// Any failure past key setup (short blob, bad padding, tag mismatch) is
/// reported as [`Error::IntegrityCheckFailed`] so callers cannot tell them
/// apart.
pub fn unwrap(blob: &[u8], keys: &SessionKeys) -> Result<Zeroizing<Vec<u8>>> {
    if blob.len() < 2 * IV_LEN || blob.len() % IV_LEN != 0 {
        return Err(Error::IntegrityCheckFailed);
    }
    let (ciphertext, iv) = blob.split_at(blob.len() - IV_LEN);

    let cipher = Aes128CbcDec::new_from_slices(keys.key_wrap_key(), iv)
        .map_err(|e| CryptoError::Encryption(format!("Invalid key or IV: {}", e)))?;

    let mut plaintext = Zeroizing::new(
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::IntegrityCheckFailed)?,
    );
    if plaintext.len() < WRAP_TAG_LEN {
        return Err(Error::IntegrityCheckFailed);
    }

    let data_len = plaintext.len() - WRAP_TAG_LEN;
    let expected = wrap_tag(keys.auth_key(), &plaintext[..data_len]);
    if !bool::from(expected.ct_eq(&plaintext[data_len..])) {
        return Err(Error::IntegrityCheckFailed);
    }

    plaintext.truncate(data_len);
    Ok(plaintext)
}

fn wrap_tag(auth_key: &[u8], data: &[u8]) -> [u8; WRAP_TAG_LEN] {
    let mut mac = Hmac::<Sha256>::new_from_slice(auth_key).expect("HMAC can take key of any size");
    mac.update(data);
    let full = mac.finalize().into_bytes();
    let mut tag = [0u8; WRAP_TAG_LEN];
    tag.copy_from_slice(&full[..WRAP_TAG_LEN]);
    tag
}
