//! Credential hashing and verification.

mod api_key;
mod credentials;
mod secrets;

pub use self::api_key::generate_api_key;
pub use self::credentials::CredentialVerifier;
pub use self::secrets::HashedSecrets;
