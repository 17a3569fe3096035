//! SeaORM entities for the `users` and `auth_tokens` tables created by the
//! `migration` crate.

pub mod auth_token;
pub mod user;
