use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{errors::AuthError, repo::UserRepository, repo_types::User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
}

/// Process-local user store.
///
/// The email check and the insert happen under one write lock, which gives
/// the same uniqueness guarantee as the Postgres index.
#[derive(Default)]
pub struct MemoryUserRepository {
    inner: RwLock<Inner>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a user record. Returns whether a record was removed.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        match inner.users.remove(&id) {
            Some(user) => {
                inner.by_email.remove(&user.email.to_lowercase());
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_email
            .get(&email.to_lowercase())
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        let key = email.to_lowercase();
        let mut inner = self.inner.write().await;
        if inner.by_email.contains_key(&key) {
            return Err(AuthError::DuplicateEmail);
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: key.clone(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.by_email.insert(key, user.id);
        inner.users.insert(user.id, user.clone());
        debug!(user_id = %user.id, "user stored in memory");
        Ok(user)
    }
}
