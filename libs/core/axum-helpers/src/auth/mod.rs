//! Opaque bearer-token authentication.
//!
//! The domain supplies a [`TokenAuthenticator`] that resolves a token key to
//! a user; [`token_auth_middleware`] guards a router with it and stores the
//! resolved [`AuthenticatedUser`] in the request extensions.
//!
//! ```ignore
//! use axum_helpers::auth::{SharedAuthenticator, token_auth_middleware};
//!
//! let auth: SharedAuthenticator = Arc::new(user_service.clone());
//! let protected = Router::new()
//!     .nest("/users", users_router)
//!     .layer(axum::middleware::from_fn_with_state(auth, token_auth_middleware));
//! ```

pub mod authenticator;
pub mod middleware;

pub use authenticator::{AuthenticatedUser, SharedAuthenticator, TokenAuthenticator};
pub use middleware::{extract_token_from_headers, token_auth_middleware};
