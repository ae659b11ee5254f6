use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

/// Longest session a token may grant: 30 days.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 30;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Argon2id work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub profile_path: Option<String>,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set")?;

        let ttl_minutes = parse_or(&lookup, "JWT_TTL_MINUTES", 60 * 24);
        if ttl_minutes <= 0 || ttl_minutes > MAX_TTL_MINUTES {
            anyhow::bail!(
                "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {ttl_minutes}"
            );
        }

        let password_defaults = PasswordConfig::default();

        Ok(Self {
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10),
                acquire_timeout_secs: parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5),
            },
            jwt: JwtConfig {
                secret,
                issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "portfolio".into()),
                audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "portfolio-users".into()),
                ttl_minutes,
            },
            password: PasswordConfig {
                memory_kib: parse_or(&lookup, "ARGON2_MEMORY_KIB", password_defaults.memory_kib),
                iterations: parse_or(&lookup, "ARGON2_ITERATIONS", password_defaults.iterations),
                parallelism: parse_or(&lookup, "ARGON2_PARALLELISM", password_defaults.parallelism),
            },
            profile_path: lookup("PROFILE_PATH").filter(|s| !s.is_empty()),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 5000),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
