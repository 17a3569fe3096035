use super::{AuthenticatedUser, SharedAuthenticator};
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

const SCHEMES: [&str; 2] = ["Bearer", "Token"];

/// Reads the token key from `Authorization: Bearer <key>`.
///
/// The `Token <key>` scheme is accepted as well. Scheme names are matched
/// case-insensitively.
pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = value.trim().split_once(' ')?;

    if !SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return None;
    }

    let key = key.trim();
    (!key.is_empty() && !key.contains(' ')).then(|| key.to_string())
}

/// Rejects requests without a valid token with `401`; otherwise inserts the
/// [`AuthenticatedUser`] into the request extensions.
pub async fn token_auth_middleware(
    State(auth): State<SharedAuthenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token_from_headers(request.headers()) else {
        tracing::debug!("No token found in Authorization header");
        return unauthorized("Authentication credentials were not provided");
    };

    match auth.authenticate(&token).await {
        Ok(Some(user)) => {
            tracing::debug!(user_id = %user.user_id, "Token authenticated");
            request.extensions_mut().insert::<AuthenticatedUser>(user);
            next.run(request).await
        }
        Ok(None) => {
            tracing::debug!("Token rejected");
            unauthorized("Invalid token")
        }
        Err(e) => e.into_response(),
    }
}

fn unauthorized(message: &str) -> Response {
    let mut response = AppError::Unauthorized(message.to_string()).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}
