//! Error types for token verification.
//!
//! [`VerifyError`] is the only error that crosses the public `verify`
//! boundary. Every internal failure (feed, key decoding, JWT library,
//! JSON) is funneled into exactly one of its variants. Display messages are
//! intentionally generic; the underlying detail is logged at debug level by
//! the layer that observed it.

use thiserror::Error;

/// Errors returned by [`TokenVerifier::verify`](crate::verifier::TokenVerifier::verify).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Token structure or unverified claims are not usable.
    #[error("The token is malformed")]
    MalformedToken,

    /// The signing key could not be found in the cache or on the key feed.
    #[error("The token signing key is unknown")]
    KeyNotFound,

    /// Signature verification failed.
    ///
    /// Covers tampering, wrong key, unsupported algorithm and expiry. Kept
    /// coarse so callers outside the trust boundary cannot tell which check
    /// rejected the token.
    #[error("The token could not be verified")]
    VerificationFailed,

    /// The trusted payload data does not match the requested shape.
    #[error("The token payload could not be deserialized")]
    DeserializationFailed,

    /// The key feed could not be reached or drained.
    #[error("The key feed is unavailable")]
    FeedUnavailable,
}

impl VerifyError {
    /// Bounded label value for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::MalformedToken => "malformed_token",
            VerifyError::KeyNotFound => "key_not_found",
            VerifyError::VerificationFailed => "verification_failed",
            VerifyError::DeserializationFailed => "deserialization_failed",
            VerifyError::FeedUnavailable => "feed_unavailable",
        }
    }
}

/// Errors raised by a [`KeyFeed`](crate::feed::KeyFeed) implementation.
///
/// An empty drain is not an error; this type only describes infrastructure
/// failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The feed could not be reached or read.
    #[error("Key feed unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while decoding key material from a feed record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyDecodeError {
    /// Record value is not valid UTF-8 text.
    #[error("Key material is not valid UTF-8")]
    NotUtf8,

    /// Record value is not valid base64.
    #[error("Key material is not valid base64: {0}")]
    Base64(String),

    /// Decoded bytes are not an RSA SubjectPublicKeyInfo structure.
    #[error("Key material is not an RSA public key: {0}")]
    InvalidKey(String),

    /// RSA modulus is below the accepted minimum.
    #[error("RSA key too small: {bits} bits")]
    KeyTooSmall {
        /// Modulus size of the rejected key.
        bits: usize,
    },
}

/// Errors raised by [`KeyResolver::resolve`](crate::resolver::KeyResolver::resolve).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Neither the cache nor a single feed drain produced the key.
    #[error("Signing key not found")]
    KeyNotFound,

    /// The feed drain failed outright.
    #[error("Key feed unavailable")]
    FeedUnavailable,
}

impl From<ResolveError> for VerifyError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::KeyNotFound => VerifyError::KeyNotFound,
            ResolveError::FeedUnavailable => VerifyError::FeedUnavailable,
        }
    }
}

impl From<FeedError> for ResolveError {
    fn from(_: FeedError) -> Self {
        ResolveError::FeedUnavailable
    }
}
