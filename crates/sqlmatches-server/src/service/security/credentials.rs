//! One-way secret hashing and comparison using Argon2id.
//!
//! Hashes are PHC strings carrying their own salt and parameters, so two
//! hashes of the same secret differ while both verify.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as ArgonError, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier};

use crate::{Error, Result, TRACING_TARGET_AUTH};

/// Hashes secrets at rest and compares presented secrets against them.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Creates a verifier and precomputes the hash used for unknown
    /// principals.
    pub fn new() -> Result<Self> {
        let argon2 = Argon2::default();
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"sqlmatches-unknown-principal", &salt)
            .map_err(|e| Error::credentials(e.to_string()))?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    /// Hashes `secret` with a fresh random salt.
    pub fn hash_secret(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!(
                    target: TRACING_TARGET_AUTH,
                    error = %e,
                    "Secret hashing failed"
                );
                Error::credentials("secret hashing failed")
            })?;

        Ok(hash.to_string())
    }

    /// Whether `secret` matches `stored_hash`.
    ///
    /// A malformed stored hash never matches.
    pub fn verify(&self, secret: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET_AUTH,
                    error = %e,
                    "Stored credential hash is malformed"
                );
                return false;
            }
        };

        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(ArgonError::Password) => {
                tracing::debug!(
                    target: TRACING_TARGET_AUTH,
                    "Credential verification failed: secret mismatch"
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET_AUTH,
                    error = %e,
                    "Credential verification system error"
                );
                false
            }
        }
    }

    /// Runs a verification that always fails, taking as long as a real one.
    /// Used when the principal does not exist.
    pub fn verify_dummy(&self, secret: &str) -> bool {
        let _ = self.verify(secret, &self.dummy_hash);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> anyhow::Result<()> {
        let verifier = CredentialVerifier::new()?;
        let hash = verifier.hash_secret("76561198000000000")?;

        assert!(verifier.verify("76561198000000000", &hash));
        assert!(!hash.contains("76561198000000000"));
        Ok(())
    }

    #[test]
    fn hash_produces_unique_salts() -> anyhow::Result<()> {
        let verifier = CredentialVerifier::new()?;
        let first = verifier.hash_secret("webhook-key")?;
        let second = verifier.hash_secret("webhook-key")?;

        assert_ne!(first, second);
        assert!(verifier.verify("webhook-key", &first));
        assert!(verifier.verify("webhook-key", &second));
        Ok(())
    }

    #[test]
    fn altered_secret_fails() -> anyhow::Result<()> {
        let verifier = CredentialVerifier::new()?;
        let hash = verifier.hash_secret("webhook-key")?;

        assert!(!verifier.verify("webhook-kez", &hash));
        assert!(!verifier.verify("Webhook-key", &hash));
        assert!(!verifier.verify("webhook-key ", &hash));
        assert!(!verifier.verify("", &hash));
        Ok(())
    }

    #[test]
    fn malformed_hash_never_matches() -> anyhow::Result<()> {
        let verifier = CredentialVerifier::new()?;
        assert!(!verifier.verify("secret", "not-a-phc-string"));
        assert!(!verifier.verify_dummy("sqlmatches-unknown-principal"));
        Ok(())
    }
}
