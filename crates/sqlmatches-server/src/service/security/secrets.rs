use std::fmt;

use super::CredentialVerifier;
use crate::Result;

/// Root and webhook secrets, held only as hashes.
#[derive(Clone)]
pub struct HashedSecrets {
    root: String,
    webhook: String,
}

impl HashedSecrets {
    /// Hashes both secrets, then overwrites and empties the plaintext
    /// buffers, whether or not hashing succeeded.
    pub fn hash(
        verifier: &CredentialVerifier,
        root: &mut String,
        webhook: &mut String,
    ) -> Result<Self> {
        let hashed = verifier.hash_secret(root.as_str()).and_then(|root_hash| {
            Ok(Self {
                root: root_hash,
                webhook: verifier.hash_secret(webhook.as_str())?,
            })
        });

        for secret in [root, webhook] {
            zero_fill(secret);
            secret.clear();
        }
        hashed
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn webhook(&self) -> &str {
        &self.webhook
    }
}

impl fmt::Debug for HashedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedSecrets").finish_non_exhaustive()
    }
}

/// Overwrites every byte of `secret` with zero, keeping its allocation.
fn zero_fill(secret: &mut String) {
    let mut bytes = std::mem::take(secret).into_bytes();
    bytes.fill(0);
    std::hint::black_box(&bytes);
    // NUL bytes are valid UTF-8.
    *secret = String::from_utf8(bytes).unwrap_or_default();
}
