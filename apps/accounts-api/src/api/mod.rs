use axum::Router;
use axum::routing::get;

pub mod health;
pub mod users;

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix is added by `create_router`.
///
/// `/register` is anonymous; everything under `/users` requires a token.
pub fn routes(state: &crate::state::AppState) -> Router {
    Router::new()
        .nest("/register", users::register_router(state))
        .nest("/users", users::router(state))
}

/// `/ready` with real database checks, merged next to the stateless router
pub fn ready_router(state: crate::state::AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

/// Prometheus scrape endpoint
pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(observability::metrics_handler))
}
