use axum::{Router, middleware};
use axum_helpers::{SharedAuthenticator, token_auth_middleware};
use domain_users::handlers;
use std::sync::Arc;

use crate::state::AppState;

/// User CRUD behind token authentication
pub fn router(state: &AppState) -> Router {
    let auth: SharedAuthenticator = Arc::new(state.users.clone());

    handlers::router(state.users.clone())
        .layer(middleware::from_fn_with_state(auth, token_auth_middleware))
}

/// Anonymous sign-up
pub fn register_router(state: &AppState) -> Router {
    handlers::register_router(state.users.clone())
}
