use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Registered user. `id` and `email` never change after creation.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub email: String,              // user email, case preserved
    pub name: String,               // display name
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime, // creation timestamp
}

/// Validated input for a new user record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}
