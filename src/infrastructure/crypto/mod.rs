//! Credential encryption
//!
//! Credentials are stored as Fernet tokens of their JSON serialization.
//! A single symmetric key is used; there is no rotation.

use fernet::Fernet;

use crate::application::errors::{ConfigError, CryptoError};
use crate::infrastructure::config::SecurityConfig;

/// Environment variable holding the Fernet key
pub const SECRET_KEY_ENV: &str = "MCPS_SECRET_KEY";

/// Symmetric cipher for connection credentials
pub struct CredentialCipher {
    fernet: Fernet,
}

impl CredentialCipher {
    /// Create a cipher from a url-safe base64 encoded 32-byte key
    pub fn new(key: &str) -> Result<Self, CryptoError> {
        let fernet = Fernet::new(key.trim()).ok_or(CryptoError::InvalidKey)?;
        Ok(Self { fernet })
    }

    /// Build the cipher from the security section of the config
    pub fn from_config(config: &SecurityConfig) -> Result<Self, ConfigError> {
        let key = config
            .secret_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField(format!("security.secret-key (or {})", SECRET_KEY_ENV)))?;

        Self::new(key).map_err(|_| ConfigError::InvalidValue("security.secret-key is not a valid Fernet key".to_string()))
    }

    /// Generate a fresh key suitable for `security.secret-key`
    pub fn generate_key() -> String {
        Fernet::generate_key()
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        self.fernet.encrypt(plaintext)
    }

    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>, CryptoError> {
        self.fernet.decrypt(token).map_err(|_| CryptoError::Decrypt)
    }

    pub fn encrypt_json(&self, value: &serde_json::Value) -> Result<String, CryptoError> {
        let plaintext = serde_json::to_vec(value)?;
        Ok(self.encrypt(&plaintext))
    }

    pub fn decrypt_json(&self, token: &str) -> Result<serde_json::Value, CryptoError> {
        let plaintext = self.decrypt(token)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCipher { .. }")
    }
}
