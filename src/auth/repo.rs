use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::auth::{errors::AuthError, repo_types::User};

/// Durable keyed collection of user records.
///
/// Implementations must enforce email uniqueness atomically: of two
/// concurrent `create` calls for the same email exactly one succeeds.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Case-insensitive exact match on email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Fails with `DuplicateEmail` if the email is already present.
    async fn create(&self, name: &str, email: &str, password_hash: &str)
        -> Result<User, AuthError>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(op: &'static str, e: sqlx::Error) -> AuthError {
    let err = AuthError::from(e);
    match &err {
        AuthError::DuplicateEmail => warn!(op, "unique email constraint hit"),
        other => error!(op, error = %other, "user store query failed"),
    }
    err
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("find_by_email", e))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("find_by_id", e))
    }

    #[instrument(skip(self, name, email, password_hash))]
    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, lower($3), $4)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("create", e))
    }
}
