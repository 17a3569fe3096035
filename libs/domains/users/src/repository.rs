use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UniqueField, UserError, UserResult};
use crate::models::{OrderTerm, User, UserFilter};

/// Repository trait for User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; `Duplicate` if a unique column clashes
    async fn create(&self, user: User) -> UserResult<User>;

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Exact-match filter, ordered by `ordering` and then by id
    async fn list(&self, filter: UserFilter, ordering: &[OrderTerm]) -> UserResult<Vec<User>>;

    /// Overwrite a stored user; `NotFound` if it is gone, `Duplicate` on a clash
    async fn update(&self, user: User) -> UserResult<User>;

    /// Returns false if nothing was deleted
    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    /// Whether a user other than `exclude` already holds `value`
    async fn is_taken(
        &self,
        field: UniqueField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> UserResult<bool>;
}

/// Compares two users by the requested ordering, falling back to id.
pub fn compare_users(a: &User, b: &User, ordering: &[OrderTerm]) -> Ordering {
    ordering
        .iter()
        .map(|term| {
            let ord = term.field.value(a).cmp(term.field.value(b));
            if term.descending { ord.reverse() } else { ord }
        })
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.id.cmp(&b.id))
}

fn unique_value(user: &User, field: UniqueField) -> &str {
    match field {
        UniqueField::Username => &user.username,
        UniqueField::Email => &user.email,
    }
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    // Called with the write lock held, which is what makes the check stick.
    fn find_clash(users: &HashMap<Uuid, User>, candidate: &User) -> Option<UniqueField> {
        [UniqueField::Username, UniqueField::Email]
            .into_iter()
            .find(|&field| {
                users.values().any(|u| {
                    u.id != candidate.id && unique_value(u, field) == unique_value(candidate, field)
                })
            })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if let Some(field) = Self::find_clash(&users, &user) {
            return Err(UserError::Duplicate(field));
        }

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn list(&self, filter: UserFilter, ordering: &[OrderTerm]) -> UserResult<Vec<User>> {
        let users = self.users.read().await;

        let mut result: Vec<User> = users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();

        result.sort_by(|a, b| compare_users(a, b, ordering));

        Ok(result)
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if !users.contains_key(&user.id) {
            return Err(UserError::NotFound(user.id));
        }

        if let Some(field) = Self::find_clash(&users, &user) {
            return Err(UserError::Duplicate(field));
        }

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, "Updated user");
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let mut users = self.users.write().await;
        let removed = users.remove(&id).is_some();

        if removed {
            tracing::info!(user_id = %id, "Deleted user");
        }

        Ok(removed)
    }

    async fn is_taken(
        &self,
        field: UniqueField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> UserResult<bool> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .any(|u| Some(u.id) != exclude && unique_value(u, field) == value))
    }
}
