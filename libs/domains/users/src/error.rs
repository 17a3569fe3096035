use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_helpers::AppError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::validation::UNIQUE;

/// Accumulated per-field validation messages, rendered as a flat
/// `{"field": ["message", ...]}` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Names of the fields that failed, in sorted order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Columns guarded by a unique constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UniqueField {
    Username,
    Email,
}

impl From<UniqueField> for FieldErrors {
    fn from(field: UniqueField) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field.as_ref(), UNIQUE);
        errors
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid input: {0:?}")]
    Validation(FieldErrors),

    /// A unique constraint fired at write time, after the pre-check passed
    #[error("User with this {0} already exists")]
    Duplicate(UniqueField),

    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid ordering field: {0}")]
    InvalidOrdering(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    /// Field-level view of the error, if it has one
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            UserError::Validation(errors) => Some(errors.clone()),
            UserError::Duplicate(field) => Some((*field).into()),
            _ => None,
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => AppError::NotFound(format!("User {} not found", id)),
            UserError::InvalidOrdering(field) => {
                AppError::BadRequest(format!("Invalid ordering field: {}", field))
            }
            UserError::Unauthorized => AppError::Unauthorized("Invalid token".to_string()),
            UserError::PasswordHash(msg) => {
                AppError::InternalServerError(format!("Password hashing failed: {}", msg))
            }
            UserError::Database(err) => AppError::Database(err),
            UserError::Internal(msg) => AppError::InternalServerError(msg),
            UserError::Validation(errors) => {
                AppError::BadRequest(format!("Invalid input: {:?}", errors))
            }
            UserError::Duplicate(field) => {
                AppError::BadRequest(format!("User with this {} already exists", field))
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        match self.field_errors() {
            Some(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            None => AppError::from(self).into_response(),
        }
    }
}
