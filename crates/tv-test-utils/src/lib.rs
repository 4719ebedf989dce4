//! # Token Verifier Test Utilities
//!
//! Shared test utilities for the token verifier.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed RSA keys for reproducible tests)
//! - Test data builders (TestTokenBuilder, token tampering helpers)
//! - Scripted key feeds (ScriptedFeed with drain counting and overlap detection)
//! - Custom assertions (VerifyResultAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tv_test_utils::*;
//!
//! #[test]
//! fn test_example() {
//!     // Feed that publishes fixture key 1 as "key-42" on first drain
//!     let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(1))]);
//!
//!     // Token signed with fixture key 1
//!     let token = TestTokenBuilder::new()
//!         .with_key_id("key-42")
//!         .with_data(&serde_json::json!({"name": "a"}))
//!         .build();
//!
//!     verifier.verify::<serde_json::Value>(&token).assert_verified();
//! }
//! ```
//!
//! Unit tests inside `token-verifier` itself may only use the fixture strings:
//! types from this crate refer to a separately compiled `token_verifier`.

pub mod assertions;
pub mod crypto_fixtures;
pub mod feeds;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use feeds::*;
pub use token_builders::*;
