//! Unverified token inspection.
//!
//! Tokens are compact JWS: `header.payload.signature`, each segment base64url
//! without padding. Before the signing key is known we only need the key id,
//! which signers put in a payload claim (`sub` by default).
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any decoding
//! - Nothing extracted here is trusted; the key id is used only as a cache /
//!   feed lookup key until the signature has been verified
//! - Errors are deliberately undetailed; causes are logged at debug level

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Default maximum accepted token size in bytes (8KB).
///
/// Rejected before base64 decoding so oversized input costs nothing.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Signature algorithms accepted for feed-distributed RSA keys.
pub const SUPPORTED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Errors from unverified token inspection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenFormatError {
    /// Token exceeds the configured size limit.
    #[error("Token too large")]
    TokenTooLarge,

    /// Token is not three base64url segments with a JSON object payload.
    #[error("Token structure is invalid")]
    Malformed,

    /// The key id claim is missing, not a string, or empty.
    #[error("Token key id claim is missing")]
    MissingKeyId,
}

/// The three segments of a compact token.
#[derive(Debug, Clone, Copy)]
pub struct TokenParts<'a> {
    /// Encoded header segment.
    pub header: &'a str,
    /// Encoded payload segment.
    pub payload: &'a str,
    /// Encoded signature segment.
    pub signature: &'a str,
}

/// Split a token into its three segments after the size check.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds `max_size`
/// - `Malformed` - not exactly three non-empty segments
pub fn split_token(token: &str, max_size: usize) -> Result<TokenParts<'_>, TokenFormatError> {
    if token.len() > max_size {
        tracing::debug!(
            target: "verifier.token",
            token_size = token.len(),
            max_size,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenFormatError::TokenTooLarge);
    }

    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(target: "verifier.token", "Token rejected: invalid segment count");
        return Err(TokenFormatError::Malformed);
    };

    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        tracing::debug!(target: "verifier.token", "Token rejected: empty segment");
        return Err(TokenFormatError::Malformed);
    }

    Ok(TokenParts {
        header,
        payload,
        signature,
    })
}

/// Extract the key id claim from a token's payload without verifying it.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds `max_size`
/// - `Malformed` - wrong structure, bad base64, payload not a JSON object
/// - `MissingKeyId` - claim absent, not a string, or empty
pub fn extract_unverified_key_id(
    token: &str,
    claim: &str,
    max_size: usize,
) -> Result<String, TokenFormatError> {
    let parts = split_token(token, max_size)?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(parts.payload).map_err(|e| {
        tracing::debug!(target: "verifier.token", error = %e, "Failed to decode token payload base64");
        TokenFormatError::Malformed
    })?;

    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "verifier.token", error = %e, "Failed to parse token payload JSON");
        TokenFormatError::Malformed
    })?;

    if !payload.is_object() {
        tracing::debug!(target: "verifier.token", "Token payload is not a JSON object");
        return Err(TokenFormatError::Malformed);
    }

    payload
        .get(claim)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(TokenFormatError::MissingKeyId)
}
