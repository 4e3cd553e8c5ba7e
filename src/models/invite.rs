//! Athlete invite model.

use serde::{Deserialize, Serialize};

/// An invite from a coach to an athlete's email address.
///
/// Invites expire after 7 days and are consumed exactly once at athlete
/// registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    /// Invite ID (uuid, also used as document ID)
    pub id: String,
    /// Coach who created the invite
    pub coach_id: String,
    /// Invited email address
    pub email: String,
    /// Opaque registration token (uuid)
    pub token: String,
    /// Whether the invite has been used
    pub used: bool,
    /// When the invite was created (ISO 8601)
    pub created_at: String,
    /// When the invite expires (ISO 8601)
    pub expires_at: String,
}
