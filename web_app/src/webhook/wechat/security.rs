//! Signature verification for WeChat webhook requests
//!
//! Every request the platform sends to the webhook carries `signature`,
//! `timestamp` and `nonce` query parameters. The signature is the SHA-1 of
//! the shared webhook token, the timestamp and the nonce, sorted as byte
//! strings and concatenated without separator, in hex.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use crate::api::errors::SignatureError;

fn digest(token: &str, timestamp: &str, nonce: &str) -> [u8; 20] {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}

/// Lowercase hex signature the platform computes for these parameters
pub fn signature_for(token: &str, timestamp: &str, nonce: &str) -> String {
    hex::encode(digest(token, timestamp, nonce))
}

/// Checks `signature` against the lowercase hex render of the expected one
/// in constant time.
///
/// The error carries no detail about which part did not match.
pub fn verify(
    token: &str,
    timestamp: &str,
    nonce: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let expected = signature_for(token, timestamp, nonce);
    let is_valid: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();

    if !is_valid {
        logfire::warn!("Webhook signature verification failed: signatures do not match");
        return Err(SignatureError);
    }

    Ok(())
}
