use std::{sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::auth::{
    jwt::TokenIssuer, memory::MemoryUserRepository, password::PasswordHasher,
    repo::PgUserRepository, repo::UserRepository, services::AuthService,
};
use crate::config::{AppConfig, JwtConfig, PasswordConfig};
use crate::profile::Profile;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Present only when a database is configured.
    pub db: Option<PgPool>,
    pub auth: Arc<AuthService>,
    pub tokens: TokenIssuer,
    pub profile: Arc<Profile>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (db, users): (Option<PgPool>, Arc<dyn UserRepository>) = match &config.database.url {
            Some(url) => {
                // Connections are opened on first use, bounded by the acquire timeout.
                let pool = PgPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
                    .connect_lazy(url)
                    .context("configure database pool")?;
                info!("using postgres user store");
                let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
                (Some(pool), users)
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                let users: Arc<dyn UserRepository> = Arc::new(MemoryUserRepository::new());
                (None, users)
            }
        };

        let profile = Profile::load(config.profile_path.as_deref())?;
        Self::from_parts(config, db, users, profile)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        db: Option<PgPool>,
        users: Arc<dyn UserRepository>,
        profile: Profile,
    ) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(&config.password)?;
        let tokens = TokenIssuer::new(&config.jwt);
        let auth = Arc::new(AuthService::new(users, hasher, tokens.clone()));
        Ok(Self {
            config,
            db,
            auth,
            tokens,
            profile: Arc::new(profile),
        })
    }

    /// In-memory state with a cheap hashing profile, for tests and local runs.
    pub fn fake(users: Arc<dyn UserRepository>) -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig {
            database: crate::config::DatabaseConfig {
                url: None,
                max_connections: 1,
                acquire_timeout_secs: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            password: PasswordConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            profile_path: None,
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::from_parts(config, None, users, Profile::bundled()?)
    }

    /// Releases the database pool, if any.
    pub async fn close(&self) {
        if let Some(db) = &self.db {
            db.close().await;
            info!("database pool closed");
        }
    }
}
