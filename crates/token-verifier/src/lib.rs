//! Token verification with keys discovered over a message feed.
//!
//! Signed tokens name their signing key by id (`sub` claim). The matching RSA
//! public key is not configured up front; it is published on an external,
//! at-least-once feed and pulled into a bounded local cache when a lookup
//! misses.
//!
//! # Architecture
//!
//! ```text
//! TokenVerifier::verify(token)
//!   → token::extract_unverified_key_id      (no trust yet)
//!   → KeyResolver::resolve(key_id)
//!       → KeyCache::get                     (hit → done)
//!       → KeyFeedReader::drain              (miss, serialized, bounded wait)
//!       → keys::decode_public_key + KeyCache::put_all
//!   → signature check with the resolved key
//!   → `data` claim → caller's type
//! ```
//!
//! # Modules
//!
//! - `cache` - bounded key id → key material map
//! - `feed` - feed trait, exclusive reader handle, in-memory feed
//! - `kafka` - Kafka-backed feed (feature `kafka`)
//! - `keys` - SPKI/base64 key decoding
//! - `resolver` - cache-miss handling
//! - `token` - unverified token inspection
//! - `verifier` - the verification pipeline
//! - `config` - environment configuration
//! - `observability` - metrics
//! - `error` - error types

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod keys;
pub mod observability;
pub mod resolver;
pub mod token;
pub mod verifier;

pub use cache::KeyCache;
pub use error::VerifyError;
pub use feed::{FeedRecord, KeyFeed, KeyFeedReader, MemoryFeedPublisher, MemoryKeyFeed};
pub use keys::PublicKeyMaterial;
pub use resolver::KeyResolver;
pub use verifier::{TokenVerifier, VerifierOptions};
