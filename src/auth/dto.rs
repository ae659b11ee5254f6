use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{errors::AuthError, repo_types::User};

pub(crate) const MIN_PASSWORD_LEN: usize = 6;
pub(crate) const MAX_PASSWORD_LEN: usize = 128;
const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, rename = "confirmPassword", alias = "confirm_password")]
    pub confirm_password: Option<String>,
}

impl RegisterRequest {
    /// Trims and lower-cases inputs, then checks them.
    pub fn validate(mut self) -> Result<Self, AuthError> {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);

        if self.name.is_empty() {
            return Err(AuthError::Validation("name is required".into()));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(AuthError::Validation("name is too long".into()));
        }
        if !is_valid_email(&self.email) {
            return Err(AuthError::Validation("email is invalid".into()));
        }
        let len = self.password.chars().count();
        if len < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if len > MAX_PASSWORD_LEN {
            return Err(AuthError::Validation("password is too long".into()));
        }
        if let Some(confirm) = &self.confirm_password {
            if confirm != &self.password {
                return Err(AuthError::Validation("passwords do not match".into()));
            }
        }
        Ok(self)
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(mut self) -> Result<Self, AuthError> {
        self.email = normalize_email(&self.email);
        if self.email.is_empty() || self.password.is_empty() {
            return Err(AuthError::Validation("email and password are required".into()));
        }
        Ok(self)
    }
}

/// Response returned after login or register.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}
