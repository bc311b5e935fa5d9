//! Session tokens and their stored identifiers
//!
//! The browser holds a random token; the database only ever sees its
//! SHA-256 digest.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use data_encoding::{BASE32_NOPAD, HEXLOWER};
use rand::RngCore;
use sha2::{Digest, Sha256};

const SESSION_TOKEN_BYTES: usize = 20;
const OAUTH_STATE_BYTES: usize = 32;

/// Generate a new session token
///
/// 20 bytes from the thread CSPRNG, encoded as lowercase unpadded base32
/// (32 characters).
pub fn generate_session_token() -> String {
    let mut bytes = [0_u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE32_NOPAD.encode(&bytes).to_ascii_lowercase()
}

/// Derive the session id stored in the database from a token
///
/// Lowercase hex SHA-256 of the token's UTF-8 bytes.
pub fn hash_session_token(token: &str) -> String {
    HEXLOWER.encode(&Sha256::digest(token.as_bytes()))
}

/// Generate an anti-forgery `state` value for the OAuth redirect
pub fn generate_oauth_state() -> String {
    let mut bytes = [0_u8; OAUTH_STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare two secrets without leaking where they differ
///
/// Both sides are hashed first so the comparison always runs over 32 bytes,
/// regardless of input lengths.
pub fn constant_time_eq(left: &str, right: &str) -> bool {
    let left = Sha256::digest(left.as_bytes());
    let right = Sha256::digest(right.as_bytes());

    left.iter()
        .zip(right.iter())
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
