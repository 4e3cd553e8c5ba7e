//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coach,
    Athlete,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Coach => "coach",
            Role::Athlete => "athlete",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "coach" => Some(Role::Coach),
            "athlete" => Some(Role::Athlete),
            _ => None,
        }
    }
}

/// User account stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Account ID (uuid, also used as document ID)
    pub id: String,
    /// Login email (unique)
    pub email: String,
    /// bcrypt password hash
    pub password_hash: String,
    /// Display name
    pub name: String,
    /// Account role
    pub role: Role,
    /// Coach this athlete belongs to (None for coaches)
    pub coach_id: Option<String>,
    /// When the account was created (ISO 8601)
    pub created_at: String,
}
