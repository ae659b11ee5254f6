use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
    errors::AuthError,
    jwt::TokenIssuer,
    password::PasswordHasher,
    repo::UserRepository,
};

/// Orchestrates registration, login and session lookups.
///
/// Registration logs the user straight in: a successful `register` always
/// returns a token, just like `login`.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    #[instrument(skip_all)]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let req = req.validate()?;

        if self.users.find_by_email(&req.email).await?.is_some() {
            warn!("registration rejected: email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let hash = self.hash(req.password).await?;
        // The store's uniqueness check is authoritative if two requests race past the lookup.
        let user = self.users.create(&req.name, &req.email, &hash).await?;
        let token = self.tokens.issue(user.id)?;

        info!(user_id = %user.id, "user registered");
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    #[instrument(skip_all)]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AuthError> {
        let req = req.validate()?;

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            self.verify_dummy(req.password).await?;
            warn!("login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify(req.password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    /// Resolves a raw session token to the user it names.
    ///
    /// Guard-free entry point: HTTP routes verify the token in
    /// `require_session` and call `current_user` directly.
    #[instrument(skip_all)]
    pub async fn me(&self, token: &str) -> Result<PublicUser, AuthError> {
        let user_id = self.tokens.verify(token)?;
        self.current_user(user_id).await
    }

    /// Looks up the user behind an already verified session.
    #[instrument(skip(self))]
    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AuthError> {
        match self.users.find_by_id(user_id).await? {
            Some(user) => Ok(user.into()),
            None => {
                warn!(%user_id, "session subject no longer exists");
                Err(AuthError::UserNotFound)
            }
        }
    }

    async fn hash(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(join_error)?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn verify(&self, password: String, digest: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(join_error)
    }

    async fn verify_dummy(&self, password: String) -> Result<(), AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
            .await
            .map_err(join_error)
    }
}

fn join_error(e: tokio::task::JoinError) -> AuthError {
    error!(error = %e, "password task failed");
    AuthError::Internal(e.to_string())
}
