//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and cached in memory. A missing or
//! malformed secret is a startup failure, not a per-request error.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::env;

/// Length of the credential vault key (AES-256-GCM).
pub const ENCRYPTION_KEY_LEN: usize = 32;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS and invite links
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Serve mock Garmin data instead of talking to the real provider
    pub garmin_mock_mode: bool,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Credential vault key (32 bytes, base64 in the environment)
    pub encryption_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            garmin_mock_mode: env::var("GARMIN_MOCK_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            encryption_key: decode_encryption_key(
                &env::var("ENCRYPTION_KEY").map_err(|_| ConfigError::Missing("ENCRYPTION_KEY"))?,
            )?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            garmin_mock_mode: true,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            encryption_key: vec![0x42; ENCRYPTION_KEY_LEN],
        }
    }
}

/// Decode and validate the base64 vault key.
fn decode_encryption_key(raw: &str) -> Result<Vec<u8>, ConfigError> {
    let key = BASE64
        .decode(raw.trim())
        .map_err(|e| ConfigError::InvalidKey(format!("ENCRYPTION_KEY is not valid base64: {}", e)))?;

    if key.len() != ENCRYPTION_KEY_LEN {
        return Err(ConfigError::InvalidKey(format!(
            "ENCRYPTION_KEY must decode to {} bytes, got {}",
            ENCRYPTION_KEY_LEN,
            key.len()
        )));
    }

    Ok(key)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_encryption_key_roundtrip() {
        let raw = BASE64.encode([7u8; ENCRYPTION_KEY_LEN]);
        let key = decode_encryption_key(&raw).expect("valid key should decode");
        assert_eq!(key, vec![7u8; ENCRYPTION_KEY_LEN]);
    }

    #[test]
    fn test_decode_encryption_key_rejects_wrong_length() {
        let raw = BASE64.encode([7u8; 16]);
        assert!(decode_encryption_key(&raw).is_err());
    }

    #[test]
    fn test_decode_encryption_key_rejects_bad_base64() {
        assert!(decode_encryption_key("not base64 at all!!!").is_err());
    }
}
