use serde::Serialize;
use time::OffsetDateTime;

/// User record held by the in-memory store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: u64,               // sequential, never reused
    pub name: String,          // display name
    pub email: String,         // unique, case-sensitive
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime, // creation timestamp, UTC
}
