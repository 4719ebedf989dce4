//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions over verification results.

use std::fmt::Debug;
use token_verifier::VerifyError;

/// Custom assertions for `TokenVerifier::verify` results
///
/// # Example
/// ```rust,ignore
/// verifier
///     .verify::<NameHolder>(&token)
///     .assert_verified_as(&NameHolder { name: "a".into() });
///
/// verifier
///     .verify::<NameHolder>(&tampered)
///     .assert_rejected_with(VerifyError::VerificationFailed);
/// ```
pub trait VerifyResultAssertions<T> {
    /// Assert that verification succeeded, returning the payload
    fn assert_verified(self) -> T;

    /// Assert that verification succeeded with exactly `expected`
    fn assert_verified_as(self, expected: &T) -> T;

    /// Assert that verification failed with `expected`
    fn assert_rejected_with(self, expected: VerifyError);
}

impl<T: Debug + PartialEq> VerifyResultAssertions<T> for Result<T, VerifyError> {
    fn assert_verified(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => panic!("Expected token to verify, got {:?} ({})", e, e),
        }
    }

    fn assert_verified_as(self, expected: &T) -> T {
        let value = self.assert_verified();
        assert_eq!(&value, expected, "Verified payload does not match");
        value
    }

    fn assert_rejected_with(self, expected: VerifyError) {
        match self {
            Ok(value) => panic!(
                "Expected rejection with {:?}, but token verified as {:?}",
                expected, value
            ),
            Err(e) => assert_eq!(e, expected, "Wrong rejection kind"),
        }
    }
}
