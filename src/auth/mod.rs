mod claims;
pub mod dto;
pub mod errors;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

/// Public auth endpoints.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Auth endpoints that need a verified session.
pub fn protected_router() -> Router<AppState> {
    handlers::me_routes()
}
