//! Opaque authentication tokens, one per user.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::UserResult;

/// Random bytes per key; hex encoding doubles the length
pub const TOKEN_BYTES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthToken {
    pub key: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn generate(user_id: Uuid) -> Self {
        Self {
            key: generate_key(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// 40 lowercase hex characters from the OS random source
pub fn generate_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    const_hex::encode(bytes)
}

/// Issues and resolves tokens
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the user's token, creating it on first use
    async fn get_or_create(&self, user_id: Uuid) -> UserResult<AuthToken>;

    async fn user_for_token(&self, key: &str) -> UserResult<Option<Uuid>>;

    /// Drops every token of the user
    async fn revoke(&self, user_id: Uuid) -> UserResult<()>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, AuthToken>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get_or_create(&self, user_id: Uuid) -> UserResult<AuthToken> {
        let mut tokens = self.tokens.write().await;

        if let Some(existing) = tokens.values().find(|t| t.user_id == user_id) {
            return Ok(existing.clone());
        }

        let token = AuthToken::generate(user_id);
        tokens.insert(token.key.clone(), token.clone());

        tracing::debug!(user_id = %user_id, "Issued token");
        Ok(token)
    }

    async fn user_for_token(&self, key: &str) -> UserResult<Option<Uuid>> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(key).map(|t| t.user_id))
    }

    async fn revoke(&self, user_id: Uuid) -> UserResult<()> {
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, t| t.user_id != user_id);
        Ok(())
    }
}
