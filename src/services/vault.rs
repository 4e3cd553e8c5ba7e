// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential vault: AES-256-GCM encryption for Garmin secrets at rest.
//!
//! Ciphertext layout is `nonce || sealed-data`, base64-encoded. The key is
//! a single process-wide secret from ENCRYPTION_KEY; a missing key fails
//! startup, never an individual request.

use crate::config::{Config, ENCRYPTION_KEY_LEN};
use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

/// Vault encryption service.
#[derive(Clone)]
pub struct VaultService {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl VaultService {
    /// Create a vault from raw key bytes (32 bytes for AES-256-GCM).
    pub fn new(key_bytes: &[u8]) -> Result<Self, AppError> {
        if key_bytes.len() != ENCRYPTION_KEY_LEN {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Vault key must be {} bytes, got {}",
                ENCRYPTION_KEY_LEN,
                key_bytes.len()
            )));
        }

        let unbound = UnboundKey::new(&AES_256_GCM, key_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to initialize vault key")))?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Create a vault from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(&config.encryption_key)
    }

    /// Encrypt plaintext with a fresh random nonce.
    /// Returns base64-encoded `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Nonce generation failed")))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Encryption failed")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);

        Ok(BASE64.encode(sealed))
    }

    /// Decrypt base64-encoded `nonce || ciphertext`.
    ///
    /// Tampered or truncated input is an error; this never returns garbage.
    pub fn decrypt(&self, ciphertext_b64: &str) -> Result<String, AppError> {
        let sealed = BASE64
            .decode(ciphertext_b64)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Base64 decode failed: {}", e)))?;

        if sealed.len() <= NONCE_LEN {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Ciphertext too short ({} bytes)",
                sealed.len()
            )));
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(&sealed[..NONCE_LEN]);
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = sealed[NONCE_LEN..].to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Decryption failed")))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("UTF-8 decode failed: {}", e)))
    }

    /// Encrypt an optional value; absent input stays absent.
    pub fn encrypt_opt(&self, plaintext: Option<&str>) -> Result<Option<String>, AppError> {
        plaintext.map(|value| self.encrypt(value)).transpose()
    }

    /// Decrypt an optional value; absent input stays absent.
    pub fn decrypt_opt(&self, ciphertext: Option<&str>) -> Result<Option<String>, AppError> {
        ciphertext.map(|value| self.decrypt(value)).transpose()
    }
}

/// Helper to encrypt a Garmin credential pair before storing.
pub fn encrypt_credentials(
    vault: &VaultService,
    username: &str,
    password: &str,
) -> Result<(String, String), AppError> {
    let encrypted_username = vault.encrypt(username)?;
    let encrypted_password = vault.encrypt(password)?;
    Ok((encrypted_username, encrypted_password))
}

/// Helper to decrypt a Garmin credential pair after retrieval.
pub fn decrypt_credentials(
    vault: &VaultService,
    encrypted_username: &str,
    encrypted_password: &str,
) -> Result<(String, String), AppError> {
    let username = vault.decrypt(encrypted_username)?;
    let password = vault.decrypt(encrypted_password)?;
    Ok((username, password))
}
