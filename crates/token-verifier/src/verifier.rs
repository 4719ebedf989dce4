//! Token verification against feed-distributed keys.
//!
//! # Pipeline
//!
//! 1. Split - three segments, size limit
//! 2. Unverified claim extraction - key id from the payload (`sub`)
//! 3. Key resolution - cache, then at most one feed drain
//! 4. Signature verification - RS256/RS384/RS512 per the header `alg`
//! 5. Payload extraction - trusted `data` claim as a string
//! 6. Deserialize - `data` parsed as JSON into the caller's type
//!
//! # Security
//!
//! - The key id is never trusted until step 4 succeeds
//! - Every signature-stage failure collapses into `VerificationFailed`
//! - A present `exp` claim is enforced; `exp` is not required

use crate::error::VerifyError;
use crate::observability::metrics;
use crate::resolver::KeyResolver;
use crate::token::{
    extract_unverified_key_id, TokenFormatError, MAX_TOKEN_SIZE_BYTES, SUPPORTED_ALGORITHMS,
};
use jsonwebtoken::{decode, decode_header, Validation};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

/// Default claim carrying the signing key id.
pub const DEFAULT_KEY_ID_CLAIM: &str = "sub";

/// Default claim carrying the opaque payload data.
pub const DEFAULT_DATA_CLAIM: &str = "data";

/// Tunables for [`TokenVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOptions {
    /// Payload claim holding the key id.
    pub key_id_claim: String,

    /// Payload claim holding the JSON-encoded data string.
    pub data_claim: String,

    /// Tokens longer than this are rejected before decoding.
    pub max_token_size: usize,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            key_id_claim: DEFAULT_KEY_ID_CLAIM.to_string(),
            data_claim: DEFAULT_DATA_CLAIM.to_string(),
            max_token_size: MAX_TOKEN_SIZE_BYTES,
        }
    }
}

/// Verifies tokens and extracts their payload data.
///
/// `Send + Sync`; share one instance across request threads.
#[derive(Debug)]
pub struct TokenVerifier {
    resolver: Arc<KeyResolver>,
    options: VerifierOptions,
}

impl TokenVerifier {
    /// Create a verifier with default options.
    #[must_use]
    pub fn new(resolver: Arc<KeyResolver>) -> Self {
        Self::with_options(resolver, VerifierOptions::default())
    }

    /// Create a verifier with explicit options.
    #[must_use]
    pub fn with_options(resolver: Arc<KeyResolver>, options: VerifierOptions) -> Self {
        Self { resolver, options }
    }

    /// The resolver used for key lookup.
    #[must_use]
    pub fn resolver(&self) -> &Arc<KeyResolver> {
        &self.resolver
    }

    /// Verify `token` and deserialize its data claim into `T`.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` - bad structure, missing key id or data claim
    /// - `KeyNotFound` - key id unknown after one feed drain
    /// - `FeedUnavailable` - the feed drain failed
    /// - `VerificationFailed` - signature, algorithm or expiry check failed
    /// - `DeserializationFailed` - data does not match `T`
    #[instrument(skip_all, target = "verifier.token")]
    pub fn verify<T>(&self, token: &str) -> Result<T, VerifyError>
    where
        T: DeserializeOwned,
    {
        let result = self.verify_inner(token);
        match &result {
            Ok(_) => {
                metrics::record_verification("success");
                tracing::debug!(target: "verifier.token", "Token verified successfully");
            }
            Err(e) => {
                metrics::record_verification(e.kind());
                tracing::debug!(target: "verifier.token", error = e.kind(), "Token rejected");
            }
        }
        result
    }

    fn verify_inner<T>(&self, token: &str) -> Result<T, VerifyError>
    where
        T: DeserializeOwned,
    {
        // 1-2. Structure and unverified key id
        let key_id = extract_unverified_key_id(
            token,
            &self.options.key_id_claim,
            self.options.max_token_size,
        )
        .map_err(|e: TokenFormatError| {
            tracing::debug!(target: "verifier.token", error = %e, "Token key id extraction failed");
            VerifyError::MalformedToken
        })?;

        // 3. Key resolution
        let material = self.resolver.resolve(&key_id)?;

        // 4. Signature verification
        let claims = verify_signature(token, material.decoding_key())?;

        // 5. Trusted data claim
        let data = claims
            .get(&self.options.data_claim)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                tracing::debug!(target: "verifier.token", "Verified token has no string data claim");
                VerifyError::MalformedToken
            })?;

        // 6. Caller's shape
        serde_json::from_str(data).map_err(|e| {
            tracing::debug!(target: "verifier.token", error = %e, "Token data does not match target type");
            VerifyError::DeserializationFailed
        })
    }
}

/// Verify the token signature with `key` and return the trusted claims.
///
/// The algorithm comes from the token header but must be one of
/// [`SUPPORTED_ALGORITHMS`].
fn verify_signature(
    token: &str,
    key: &jsonwebtoken::DecodingKey,
) -> Result<serde_json::Value, VerifyError> {
    let header = decode_header(token).map_err(|e| {
        tracing::debug!(target: "verifier.token", error = %e, "Failed to decode token header");
        VerifyError::VerificationFailed
    })?;

    if !SUPPORTED_ALGORITHMS.contains(&header.alg) {
        tracing::debug!(target: "verifier.token", alg = ?header.alg, "Unsupported token algorithm");
        return Err(VerifyError::VerificationFailed);
    }

    let mut validation = Validation::new(header.alg);
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    validation.validate_aud = false;

    let token_data = decode::<serde_json::Value>(token, key, &validation).map_err(|e| {
        tracing::debug!(target: "verifier.token", error = %e, "Token signature verification failed");
        VerifyError::VerificationFailed
    })?;

    Ok(token_data.claims)
}
