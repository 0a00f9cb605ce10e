//! Key exchange.

use super::GUID;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};

/// Generate a new `sec-websocket-key`.
#[inline]
pub fn new_sec_key() -> String {
    let input: [u8; 16] = rand::random();
    STANDARD.encode(input)
}

/// Derive `sec-websocket-accept` from `sec-websocket-key`.
#[inline]
pub fn derive_accept_key(sec_key: &[u8]) -> String {
    let mut sha1 = Sha1::default();
    sha1.update(sec_key);
    sha1.update(GUID);
    STANDARD.encode(sha1.finalize())
}
