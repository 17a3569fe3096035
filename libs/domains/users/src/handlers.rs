use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AuditEvent, AuditOutcome, AuthenticatedUser, JsonBody, UuidPath,
    errors::responses::{
        BadRequestUuidResponse, InternalServerErrorResponse, NotFoundResponse,
        UnauthorizedResponse,
    },
};
use observability::{AccountMetrics, Operation, Outcome};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::{FieldErrors, UserError, UserResult};
use crate::models::{Registration, UserListQuery, UserPayload, UserResponse};
use crate::repository::UserRepository;
use crate::service::UserService;
use crate::tokens::TokenStore;

pub const TAG: &str = "Users";

/// Security scheme name the app registers for `Authorization: Bearer <token>`
pub const SECURITY_SCHEME: &str = "token_auth";

/// OpenAPI documentation for the token-protected user endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        list_users,
        create_user,
        get_user,
        replace_user,
        update_user,
        delete_user,
    ),
    components(
        schemas(UserResponse, UserPayload, FieldErrors),
        responses(
            NotFoundResponse,
            BadRequestUuidResponse,
            UnauthorizedResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "User management endpoints")
    )
)]
pub struct ApiDoc;

/// OpenAPI documentation for anonymous sign-up
#[derive(OpenApi)]
#[openapi(
    paths(register),
    components(schemas(Registration, UserResponse, UserPayload, FieldErrors)),
    tags(
        (name = TAG, description = "User management endpoints")
    )
)]
pub struct RegisterApiDoc;

/// Create the user router. Callers put it behind token authentication.
pub fn router<R, T>(service: UserService<R, T>) -> Router
where
    R: UserRepository + 'static,
    T: TokenStore + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user)
                .put(replace_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .with_state(shared_service)
}

/// Create the anonymous registration router
pub fn register_router<R, T>(service: UserService<R, T>) -> Router
where
    R: UserRepository + 'static,
    T: TokenStore + 'static,
{
    Router::new()
        .route("/", post(register))
        .with_state(Arc::new(service))
}

fn outcome_of<V>(result: &UserResult<V>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(
            UserError::Validation(_) | UserError::Duplicate(_) | UserError::InvalidOrdering(_),
        ) => Outcome::Invalid,
        Err(UserError::NotFound(_)) => Outcome::NotFound,
        Err(_) => Outcome::Error,
    }
}

fn track<V>(operation: Operation, result: &UserResult<V>) {
    AccountMetrics::record_operation(operation, outcome_of(result));
}

fn audit<V>(
    action: &str,
    actor: Option<&AuthenticatedUser>,
    resource: Option<Uuid>,
    headers: &HeaderMap,
    result: &UserResult<V>,
) {
    let outcome = if result.is_ok() {
        AuditOutcome::Success
    } else {
        AuditOutcome::Failure
    };

    let mut event = AuditEvent::new(action, outcome)
        .with_actor(actor.map(|a| a.user_id))
        .with_request_headers(headers);

    if let Some(id) = resource {
        event = event.with_resource(format!("user:{}", id));
    }
    if let Err(err) = result {
        let details = match err.field_errors() {
            Some(errors) => json!({ "rejected_fields": errors.fields().collect::<Vec<_>>() }),
            None => json!({ "error": err.to_string() }),
        };
        event = event.with_details(details);
    }

    event.log();
}

/// Register a new account and receive its token
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = UserPayload,
    responses(
        (status = 201, description = "Account created", body = Registration),
        (status = 400, description = "Field errors", body = FieldErrors),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register<R: UserRepository, T: TokenStore>(
    State(service): State<Arc<UserService<R, T>>>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<UserPayload>,
) -> UserResult<impl IntoResponse> {
    let result = service.register(payload).await;

    track(Operation::Register, &result);
    let created_id = result.as_ref().ok().map(|r| r.user.id);
    audit("user.register", None, created_id, &headers, &result);

    Ok((StatusCode::CREATED, Json(result?)))
}

/// List users with optional exact-match filters and ordering
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(UserListQuery),
    security(("token_auth" = [])),
    responses(
        (status = 200, description = "Matching users", body = Vec<UserResponse>),
        (status = 400, description = "Unknown ordering field"),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository, T: TokenStore>(
    State(service): State<Arc<UserService<R, T>>>,
    Query(query): Query<UserListQuery>,
) -> UserResult<Json<Vec<UserResponse>>> {
    let result = service.list_users(query).await;
    track(Operation::List, &result);
    Ok(Json(result?))
}

/// Create a user
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = UserPayload,
    security(("token_auth" = [])),
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Field errors", body = FieldErrors),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository, T: TokenStore>(
    State(service): State<Arc<UserService<R, T>>>,
    actor: Option<AuthenticatedUser>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<UserPayload>,
) -> UserResult<impl IntoResponse> {
    let result = service.create_user(payload).await;

    track(Operation::Create, &result);
    let created_id = result.as_ref().ok().map(|u| u.id);
    audit("user.create", actor.as_ref(), created_id, &headers, &result);

    Ok((StatusCode::CREATED, Json(result?)))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    security(("token_auth" = [])),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository, T: TokenStore>(
    State(service): State<Arc<UserService<R, T>>>,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserResponse>> {
    let result = service.get_user(id).await;
    track(Operation::Retrieve, &result);
    Ok(Json(result?))
}

/// Replace a user; username, email and both passwords are required
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UserPayload,
    security(("token_auth" = [])),
    responses(
        (status = 200, description = "User replaced", body = UserResponse),
        (status = 400, description = "Field errors or invalid UUID", body = FieldErrors),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn replace_user<R: UserRepository, T: TokenStore>(
    State(service): State<Arc<UserService<R, T>>>,
    actor: Option<AuthenticatedUser>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    JsonBody(payload): JsonBody<UserPayload>,
) -> UserResult<Json<UserResponse>> {
    save(&service, actor, &headers, id, payload, false).await
}

/// Update the supplied fields of a user
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UserPayload,
    security(("token_auth" = [])),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Field errors or invalid UUID", body = FieldErrors),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_user<R: UserRepository, T: TokenStore>(
    State(service): State<Arc<UserService<R, T>>>,
    actor: Option<AuthenticatedUser>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    JsonBody(payload): JsonBody<UserPayload>,
) -> UserResult<Json<UserResponse>> {
    save(&service, actor, &headers, id, payload, true).await
}

async fn save<R: UserRepository, T: TokenStore>(
    service: &UserService<R, T>,
    actor: Option<AuthenticatedUser>,
    headers: &HeaderMap,
    id: Uuid,
    payload: UserPayload,
    partial: bool,
) -> UserResult<Json<UserResponse>> {
    let result = service.update_user(id, payload, partial).await;

    track(Operation::Update, &result);
    audit("user.update", actor.as_ref(), Some(id), headers, &result);

    Ok(Json(result?))
}

/// Delete a user and its tokens
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    security(("token_auth" = [])),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository, T: TokenStore>(
    State(service): State<Arc<UserService<R, T>>>,
    actor: Option<AuthenticatedUser>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> UserResult<StatusCode> {
    let result = service.delete_user(id).await;

    track(Operation::Delete, &result);
    audit("user.delete", actor.as_ref(), Some(id), &headers, &result);

    result?;
    Ok(StatusCode::NO_CONTENT)
}
