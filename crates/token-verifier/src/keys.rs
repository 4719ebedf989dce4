//! Public key material distributed over the key feed.
//!
//! Feed records carry an RSA public key as standard base64 of its X.509
//! `SubjectPublicKeyInfo` DER encoding. PEM armor lines and embedded
//! whitespace are tolerated so keys can be published straight from
//! `openssl pkey -pubout`.

use crate::error::KeyDecodeError;
use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::DecodingKey;
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use std::fmt;

/// Minimum accepted RSA modulus size in bits.
///
/// Matches the lower bound the signature backend enforces for RS256/384/512.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// A decoded, verifier-ready RSA public key.
///
/// Immutable once built. Shared between the cache and in-flight verifications
/// as `Arc<PublicKeyMaterial>`.
#[derive(Clone)]
pub struct PublicKeyMaterial {
    decoding_key: DecodingKey,
    bits: usize,
}

impl PublicKeyMaterial {
    /// Key usable by `jsonwebtoken::decode`.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// RSA modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl fmt::Debug for PublicKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyMaterial")
            .field("kind", &"RSA")
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

/// Decode a feed record value into [`PublicKeyMaterial`].
///
/// # Errors
///
/// - `NotUtf8` - value is not text
/// - `Base64` - text is not standard base64
/// - `InvalidKey` - bytes are not an RSA `SubjectPublicKeyInfo`
/// - `KeyTooSmall` - modulus is below [`MIN_RSA_KEY_BITS`]
pub fn decode_public_key(raw: &[u8]) -> Result<PublicKeyMaterial, KeyDecodeError> {
    let text = std::str::from_utf8(raw).map_err(|_| KeyDecodeError::NotUtf8)?;

    let b64: String = text
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect();

    let der = STANDARD
        .decode(b64)
        .map_err(|e| KeyDecodeError::Base64(e.to_string()))?;

    let public_key = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| KeyDecodeError::InvalidKey(e.to_string()))?;

    let bits = public_key.size() * 8;
    if bits < MIN_RSA_KEY_BITS {
        return Err(KeyDecodeError::KeyTooSmall { bits });
    }

    let pkcs1 = public_key
        .to_pkcs1_der()
        .map_err(|e| KeyDecodeError::InvalidKey(e.to_string()))?;

    Ok(PublicKeyMaterial {
        decoding_key: DecodingKey::from_rsa_der(pkcs1.as_bytes()),
        bits,
    })
}
