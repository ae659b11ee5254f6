pub mod content;
pub mod handlers;

pub use content::Profile;

use crate::state::AppState;
use axum::Router;

/// Profile endpoints; mount behind the session guard.
pub fn router() -> Router<AppState> {
    handlers::profile_routes()
}
