//! JSON body extractor that rejects with the standard error envelope.

use crate::errors::AppError;
use axum::{
    extract::{FromRequest, Json, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Like [`axum::Json`], but a missing content type, malformed JSON or a
/// type mismatch is reported as `JSON_EXTRACTION` instead of plain text.
///
/// Field-level rules are left to the domain.
///
/// ```ignore
/// async fn create_user(JsonBody(payload): JsonBody<UserPayload>) -> StatusCode {
///     StatusCode::CREATED
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| AppError::from(rejection).into_response())
    }
}
