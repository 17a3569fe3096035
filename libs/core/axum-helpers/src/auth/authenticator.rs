use crate::errors::AppError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

/// Identity attached to a request by [`super::token_auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Resolves a presented token key to the user that owns it.
///
/// `Ok(None)` means the token is unknown or belongs to a user that may not
/// authenticate; `Err` is reserved for backend failures.
#[async_trait]
pub trait TokenAuthenticator: Send + Sync + 'static {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthenticatedUser>, AppError>;
}

pub type SharedAuthenticator = Arc<dyn TokenAuthenticator>;

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                AppError::Unauthorized(
                    "Authentication credentials were not provided".to_string(),
                )
            })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}
