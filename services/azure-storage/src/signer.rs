//! Shared Key signature primitives.

use azsign_core::hash::{base64_decode, base64_hmac_sha256};
use azsign_core::Result;

/// Compute HMAC-SHA256 of `data` under `key`.
///
/// Any key length is accepted, including the empty key.
pub fn hmac_sha256(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    azsign_core::hash::hmac_sha256(key, data)
}

/// Sign a canonical string with a Base64 encoded account key.
///
/// The canonical string is signed as its UTF-8 bytes and the MAC is returned
/// Base64 encoded. A key that is not valid Base64 yields
/// [`ErrorKind::InvalidKey`](azsign_core::ErrorKind::InvalidKey).
pub fn sign_string(canonical: &str, account_key: &str) -> Result<String> {
    let key = base64_decode(account_key)?;
    sign_string_with_decoded_key(canonical, &key)
}

pub(crate) fn sign_string_with_decoded_key(canonical: &str, key: &[u8]) -> Result<String> {
    base64_hmac_sha256(key, canonical.as_bytes())
}
