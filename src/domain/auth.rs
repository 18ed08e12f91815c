//! Authentication primitives: login credentials and password digests.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.

use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsValidationError {
    /// Email was missing, blank, or obviously not an address.
    InvalidEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for CredentialsValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "a valid email address is required"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for CredentialsValidationError {}

/// Validated login credentials used by the account service.
///
/// ## Invariants
/// - `email` is trimmed, lowercased, and contains an `@`.
/// - `password` is non-empty but retains caller-provided whitespace to avoid
///   surprising credential comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Construct credentials from raw email/password inputs.
    ///
    /// # Examples
    /// ```
    /// use riada_backend::domain::auth::Credentials;
    ///
    /// let creds = Credentials::try_from_parts("  Ana@Example.org ", "secret").unwrap();
    /// assert_eq!(creds.email(), "ana@example.org");
    /// ```
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() || !normalized.contains('@') {
            return Err(CredentialsValidationError::InvalidEmail);
        }
        if password.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }
        Ok(Self {
            email: normalized,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email address suitable for account lookups.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Salted SHA-256 digest of an account password.
///
/// Stored form is `hex(salt):hex(sha256(salt || password))`. The digest is
/// a domain type with no serde support so it can never leak through a view
/// DTO by accident; the persistence adapter stores the string form
/// explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Hash a password under a fresh random salt.
    pub fn hash(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(format!(
            "{}:{}",
            hex::encode(salt),
            hex::encode(Self::digest(&salt, password))
        ))
    }

    /// Rehydrate a digest from its stored string form.
    pub fn from_stored(stored: impl Into<String>) -> Self {
        Self(stored.into())
    }

    /// Stored string form for the persistence adapter.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Verify a candidate password in constant time.
    ///
    /// Malformed stored digests verify as false rather than erroring; a
    /// corrupt credential record must never let a login through.
    pub fn verify(&self, password: &str) -> bool {
        let Some((salt_hex, digest_hex)) = self.0.split_once(':') else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
            return false;
        };
        let actual = Self::digest(&salt, password);
        actual.ct_eq(expected.as_slice()).into()
    }

    fn digest(salt: &[u8], password: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "pw", CredentialsValidationError::InvalidEmail)]
    #[case("   ", "pw", CredentialsValidationError::InvalidEmail)]
    #[case("not-an-address", "pw", CredentialsValidationError::InvalidEmail)]
    #[case("ana@example.org", "", CredentialsValidationError::EmptyPassword)]
    fn invalid_credentials(
        #[case] email: &str,
        #[case] password: &str,
        #[case] expected: CredentialsValidationError,
    ) {
        let err =
            Credentials::try_from_parts(email, password).expect_err("invalid inputs must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn email_is_normalised() {
        let creds = Credentials::try_from_parts(" Ana@Example.ORG ", "secret").expect("valid");
        assert_eq!(creds.email(), "ana@example.org");
        assert_eq!(creds.password(), "secret");
    }

    #[rstest]
    fn digest_verifies_matching_password_only() {
        let digest = PasswordDigest::hash("correct horse battery staple");
        assert!(digest.verify("correct horse battery staple"));
        assert!(!digest.verify("correct horse battery"));
    }

    #[rstest]
    fn salts_differ_between_hashes() {
        let first = PasswordDigest::hash("secret");
        let second = PasswordDigest::hash("secret");
        assert_ne!(first.as_str(), second.as_str());
        assert!(first.verify("secret"));
        assert!(second.verify("secret"));
    }

    #[rstest]
    #[case("")]
    #[case("no-separator")]
    #[case("zz:not-hex")]
    fn malformed_stored_digests_never_verify(#[case] stored: &str) {
        assert!(!PasswordDigest::from_stored(stored).verify("anything"));
    }

    #[rstest]
    fn stored_form_round_trips() {
        let digest = PasswordDigest::hash("secret");
        let restored = PasswordDigest::from_stored(digest.as_str());
        assert!(restored.verify("secret"));
    }
}
