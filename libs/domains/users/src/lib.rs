//! Users Domain
//!
//! User accounts for the accounts API: registration with token issuance,
//! token-protected CRUD, exact-match filtering and ordering.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, audit events, metrics
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, uniqueness pre-check, Argon2, tokens
//! └──────┬──────┘
//!        │
//! ┌──────▼──────────────────────┐
//! │ UserRepository / TokenStore │  ← in-memory or Postgres
//! └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{InMemoryTokenStore, InMemoryUserRepository, UserService, handlers};
//!
//! let service = UserService::new(InMemoryUserRepository::new(), InMemoryTokenStore::new());
//!
//! let register = handlers::register_router(service.clone());
//! let users = handlers::router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod tokens;
pub mod validation;

// Re-export commonly used types
pub use error::{FieldErrors, UniqueField, UserError, UserResult};
pub use handlers::{ApiDoc, RegisterApiDoc};
pub use models::{
    OrderField, OrderTerm, Registration, User, UserChanges, UserFilter, UserListQuery,
    UserPayload, UserResponse,
};
pub use postgres::{PgTokenStore, PgUserRepository};
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
pub use tokens::{AuthToken, InMemoryTokenStore, TokenStore};
pub use validation::ValidationMode;
