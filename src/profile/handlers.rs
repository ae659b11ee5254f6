use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, instrument};

use crate::{auth::extractors::AuthUser, profile::Profile, state::AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Json<Profile> {
    debug!(%user_id, "profile viewed");
    Json(state.profile.as_ref().clone())
}
