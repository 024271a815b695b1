//! Random token generation.

use rand::RngCore;

/// Generate a random 128-bit login state token, hex-encoded.
///
/// Tokens are single-use and globally unique for practical purposes; there
/// is no collision handling downstream.
pub fn state_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
