//! Builder patterns for test data construction
//!
//! Provides fluent APIs for signed test tokens and for corrupting them.

use crate::crypto_fixtures::test_private_key_pem;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Builder for signed test tokens
///
/// Defaults: key id `test-key`, data `{}`, RS256, fixture key 1, no `exp`.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_key_id("key-42")
///     .with_data(&NameHolder { name: "a".into() })
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    key_id: Option<String>,
    data: Option<Value>,
    alg: Algorithm,
    seed: u8,
    exp: Option<i64>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        Self {
            key_id: Some("test-key".to_string()),
            data: Some(Value::String("{}".to_string())),
            alg: Algorithm::RS256,
            seed: 1,
            exp: None,
            extra: Map::new(),
        }
    }

    /// Set the `sub` claim (the signing key id)
    pub fn with_key_id(mut self, key_id: &str) -> Self {
        self.key_id = Some(key_id.to_string());
        self
    }

    /// Omit the `sub` claim entirely
    pub fn without_key_id(mut self) -> Self {
        self.key_id = None;
        self
    }

    /// Set the `data` claim to the JSON encoding of `data`
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        let encoded = serde_json::to_string(data).expect("Failed to serialize test data");
        self.data = Some(Value::String(encoded));
        self
    }

    /// Set the `data` claim to a raw JSON value (need not be a string)
    pub fn with_raw_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Omit the `data` claim entirely
    pub fn without_data(mut self) -> Self {
        self.data = None;
        self
    }

    /// Set the signing algorithm (RSA family only)
    pub fn with_algorithm(mut self, alg: Algorithm) -> Self {
        self.alg = alg;
        self
    }

    /// Sign with fixture key `seed`
    pub fn signed_with(mut self, seed: u8) -> Self {
        self.seed = seed;
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Add an arbitrary extra claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn claims(&self) -> Value {
        let mut claims = self.extra.clone();
        if let Some(key_id) = &self.key_id {
            claims.insert("sub".to_string(), json!(key_id));
        }
        if let Some(data) = &self.data {
            claims.insert("data".to_string(), data.clone());
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        Value::Object(claims)
    }

    /// Sign and encode the token
    pub fn build(self) -> String {
        let key = EncodingKey::from_rsa_pem(test_private_key_pem(self.seed).as_bytes())
            .expect("Fixture private key must load");
        encode(&Header::new(self.alg), &self.claims(), &key).expect("Failed to sign test token")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a compact token into its three segments.
fn segments(token: &str) -> [&str; 3] {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "Token must have 3 segments");
    [parts[0], parts[1], parts[2]]
}

/// Replace the payload with `claims` while keeping the original signature.
pub fn with_forged_claims(token: &str, claims: &Value) -> String {
    let [header, _, signature] = segments(token);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("claims serialize"));
    format!("{header}.{payload}.{signature}")
}

/// Flip one bit of the decoded signature at `index` (modulo its length).
pub fn tamper_signature(token: &str, index: usize) -> String {
    let [header, payload, signature] = segments(token);
    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("Signature must be base64url");
    let i = index % bytes.len();
    bytes[i] ^= 0x01;
    format!("{header}.{payload}.{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Flip one bit of the decoded payload at `index` (modulo its length).
///
/// The result is not necessarily valid JSON; either way the signature no
/// longer matches.
pub fn tamper_payload(token: &str, index: usize) -> String {
    let [header, payload, signature] = segments(token);
    let mut bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .expect("Payload must be base64url");
    let i = index % bytes.len();
    bytes[i] ^= 0x01;
    format!("{header}.{}.{signature}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Decoded length of the signature segment.
pub fn signature_len(token: &str) -> usize {
    let [_, _, signature] = segments(token);
    URL_SAFE_NO_PAD.decode(signature).map(|b| b.len()).unwrap_or(0)
}

/// Decoded length of the payload segment.
pub fn payload_len(token: &str) -> usize {
    let [_, payload, _] = segments(token);
    URL_SAFE_NO_PAD.decode(payload).map(|b| b.len()).unwrap_or(0)
}
