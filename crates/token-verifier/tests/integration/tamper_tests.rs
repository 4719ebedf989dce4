//! Tamper detection: a signed token altered after signing never verifies.

use crate::harness::{verifier, NameHolder};
use serde_json::json;
use token_verifier::{TokenVerifier, VerifyError};
use tv_test_utils::*;

fn signed_fixture() -> (TokenVerifier, String, TestTokenBuilder) {
    let feed = ScriptedFeed::new().then_keys(&[("key-42", test_public_key_b64(1))]);
    let verifier = verifier(feed);
    let builder = || {
        TestTokenBuilder::new()
            .with_key_id("key-42")
            .with_data(&NameHolder::new("abcdefgh"))
            .with_claim("note", json!("0123456789"))
    };
    let token = builder().build();

    // Warm the cache so tampered variants never depend on the feed
    verifier.verify::<NameHolder>(&token).assert_verified();
    (verifier, token, builder())
}

#[test]
fn test_every_signature_byte_is_protected() {
    let (verifier, token, _) = signed_fixture();

    for index in 0..signature_len(&token) {
        let tampered = tamper_signature(&token, index);
        verifier
            .verify::<NameHolder>(&tampered)
            .assert_rejected_with(VerifyError::VerificationFailed);
    }
}

#[test]
fn test_decodable_payload_edits_fail_verification() {
    let (verifier, token, builder) = signed_fixture();
    let original = builder.claims();

    // Rewrite each character of the data and note claims, keep the signature
    for claim in ["data", "note"] {
        let value = original[claim].as_str().unwrap().to_string();
        for (i, c) in value.char_indices() {
            let replacement = if c == 'z' { 'y' } else { 'z' };
            let mut edited = value.clone();
            edited.replace_range(i..i + c.len_utf8(), &replacement.to_string());

            let mut claims = original.clone();
            claims[claim] = json!(edited);
            let forged = with_forged_claims(&token, &claims);

            verifier
                .verify::<serde_json::Value>(&forged)
                .assert_rejected_with(VerifyError::VerificationFailed);
        }
    }
}

#[test]
fn test_added_claim_fails_verification() {
    let (verifier, token, builder) = signed_fixture();
    let mut claims = builder.claims();
    claims["admin"] = json!(true);

    verifier
        .verify::<NameHolder>(&with_forged_claims(&token, &claims))
        .assert_rejected_with(VerifyError::VerificationFailed);
}

#[test]
fn test_no_payload_bit_flip_verifies() {
    let (verifier, token, _) = signed_fixture();

    // Raw flips may break the JSON or the key id, but must never verify
    for index in 0..payload_len(&token) {
        let tampered = tamper_payload(&token, index);
        let result = verifier.verify::<serde_json::Value>(&tampered);
        assert!(
            result.is_err(),
            "Payload flip at byte {} verified successfully",
            index
        );
    }
}

#[test]
fn test_swapped_signature_from_other_token_fails() {
    let (verifier, token, _) = signed_fixture();
    let other = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&NameHolder::new("other"))
        .build();

    let token_parts: Vec<&str> = token.split('.').collect();
    let other_parts: Vec<&str> = other.split('.').collect();
    let spliced = format!("{}.{}.{}", token_parts[0], token_parts[1], other_parts[2]);

    verifier
        .verify::<NameHolder>(&spliced)
        .assert_rejected_with(VerifyError::VerificationFailed);
}
