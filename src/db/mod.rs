//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const INVITES: &str = "invites";
    pub const RUNS: &str = "runs";
    pub const GARMIN_CONNECTIONS: &str = "garmin_connections";
    pub const WEEKLY_STATS: &str = "weekly_stats";
}
