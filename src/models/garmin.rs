// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Garmin connection model (encrypted at rest).

use serde::{Deserialize, Serialize};

/// A user's Garmin Connect link, stored in Firestore.
///
/// Credentials and session tokens are encrypted by the vault before they
/// reach this struct; plaintext never touches storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarminConnection {
    /// Owning user ID (also used as document ID; one connection per user)
    pub user_id: String,
    /// Encrypted Garmin username (base64)
    pub encrypted_username: String,
    /// Encrypted Garmin password (base64)
    pub encrypted_password: String,
    /// Encrypted OAuth1 token artifact (base64)
    pub oauth1_token_encrypted: Option<String>,
    /// Encrypted OAuth2 token artifact (base64)
    pub oauth2_token_encrypted: Option<String>,
    /// Garmin-side user identifier (display name)
    pub garmin_user_id: String,
    /// When the connection was established (ISO 8601)
    pub connected_at: String,
    /// When activities were last fetched (ISO 8601)
    pub last_sync_at: Option<String>,
}
