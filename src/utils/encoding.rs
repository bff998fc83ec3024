//! Encoding helpers for compact tokens

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;

/// Decode one base64 segment of a compact token.
///
/// ID tokens use the URL-safe alphabet without padding, but some issuers pad
/// or use the standard alphabet, so both are accepted.
pub fn decode_base64_segment(segment: &str) -> Option<Vec<u8>> {
    let trimmed = segment.trim().trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}

/// Decode the JSON payload (middle segment) of a three-part compact token
pub fn decode_token_payload(token: &str) -> Option<serde_json::Value> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = decode_base64_segment(payload)?;
    serde_json::from_slice(&bytes).ok()
}
