//! End-to-end verification: publish a key, sign a payload, verify it back.

use crate::harness::{verifier, NameHolder};
use jsonwebtoken::Algorithm;
use serde_json::json;
use token_verifier::VerifyError;
use tv_test_utils::*;

#[test]
fn test_published_key_round_trips_payload() {
    let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(1))]);
    let probe = feed.probe();
    let verifier = verifier(feed);

    let token = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&NameHolder::new("a"))
        .build();

    verifier
        .verify::<NameHolder>(&token)
        .assert_verified_as(&NameHolder::new("a"));
    assert_eq!(probe.drain_count(), 1);

    // Second verification is served from the cache
    verifier
        .verify::<NameHolder>(&token)
        .assert_verified_as(&NameHolder::new("a"));
    assert_eq!(probe.drain_count(), 1);
}

#[test]
fn test_round_trip_for_each_rsa_algorithm() {
    let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(2))]);
    let verifier = verifier(feed);

    for alg in [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512] {
        let token = TestTokenBuilder::new()
            .with_key_id("key-42")
            .with_data(&NameHolder::new("multi"))
            .with_algorithm(alg)
            .signed_with(2)
            .build();

        verifier
            .verify::<NameHolder>(&token)
            .assert_verified_as(&NameHolder::new("multi"));
    }
}

#[test]
fn test_round_trip_into_untyped_json() {
    let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(1))]);
    let verifier = verifier(feed);
    let data = json!({"order": 17, "items": ["a", "b"], "paid": true});

    let token = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&data)
        .build();

    verifier
        .verify::<serde_json::Value>(&token)
        .assert_verified_as(&data);
}

#[test]
fn test_unexpired_token_verifies_and_expired_is_rejected() {
    let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(1))]);
    let verifier = verifier(feed);

    let fresh = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&NameHolder::new("fresh"))
        .expires_in(3600)
        .build();
    verifier.verify::<NameHolder>(&fresh).assert_verified();

    let stale = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&NameHolder::new("stale"))
        .expires_in(-3600)
        .build();
    verifier
        .verify::<NameHolder>(&stale)
        .assert_rejected_with(VerifyError::VerificationFailed);
}

#[test]
fn test_token_signed_by_other_key_is_rejected() {
    let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(1))]);
    let verifier = verifier(feed);

    let token = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&NameHolder::new("a"))
        .signed_with(2)
        .build();

    verifier
        .verify::<NameHolder>(&token)
        .assert_rejected_with(VerifyError::VerificationFailed);
}

#[test]
fn test_structural_failures_are_malformed() {
    let verifier = verifier(ScriptedFeed::new());

    for token in ["", "abc", "a.b", "a.b.c.d", "..", "a..c"] {
        verifier
            .verify::<NameHolder>(token)
            .assert_rejected_with(VerifyError::MalformedToken);
    }

    let without_key_id = TestTokenBuilder::new().without_key_id().build();
    verifier
        .verify::<NameHolder>(&without_key_id)
        .assert_rejected_with(VerifyError::MalformedToken);
}

#[test]
fn test_missing_data_claim_is_malformed() {
    let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(1))]);
    let verifier = verifier(feed);

    let token = TestTokenBuilder::new()
        .with_key_id("key-42")
        .without_data()
        .build();

    verifier
        .verify::<NameHolder>(&token)
        .assert_rejected_with(VerifyError::MalformedToken);
}

#[test]
fn test_payload_shape_mismatch_is_deserialization_failure() {
    let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(1))]);
    let verifier = verifier(feed);

    let token = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&json!({"title": "no name here"}))
        .build();

    verifier
        .verify::<NameHolder>(&token)
        .assert_rejected_with(VerifyError::DeserializationFailed);
}
