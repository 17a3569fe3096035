//! # Axum Helpers
//!
//! Shared HTTP plumbing for the accounts service.
//!
//! - **[`auth`]**: opaque token authentication middleware and extractor
//! - **[`server`]**: router assembly, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: structured error responses with error codes
//! - **[`extractors`]**: UUID path and JSON body extractors
//! - **[`audit`]**: audit logging

pub mod audit;
pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{AuthenticatedUser, SharedAuthenticator, TokenAuthenticator, token_auth_middleware};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks,
};

pub use http::{create_cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{JsonBody, UuidPath};

pub use audit::{AuditEvent, AuditOutcome, extract_ip_from_headers, extract_user_agent};
