use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,                // stored lower-cased
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 PHC string, never exposed
    pub created_at: OffsetDateTime,
}
