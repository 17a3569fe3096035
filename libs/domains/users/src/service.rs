use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use axum_helpers::{AppError, AuthenticatedUser, TokenAuthenticator};
use observability::{AccountMetrics, Operation};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{FieldErrors, UniqueField, UserError, UserResult};
use crate::models::{Registration, User, UserChanges, UserListQuery, UserPayload, UserResponse};
use crate::repository::UserRepository;
use crate::tokens::TokenStore;
use crate::validation::{self, UNIQUE, ValidationMode};

/// Service layer for User business logic
pub struct UserService<R: UserRepository, T: TokenStore> {
    repository: Arc<R>,
    tokens: Arc<T>,
}

// Manual impl: derive would demand `R: Clone + T: Clone`.
impl<R: UserRepository, T: TokenStore> Clone for UserService<R, T> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl<R: UserRepository, T: TokenStore> UserService<R, T> {
    pub fn new(repository: R, tokens: T) -> Self {
        Self {
            repository: Arc::new(repository),
            tokens: Arc::new(tokens),
        }
    }

    /// Create a user on behalf of an authenticated caller
    pub async fn create_user(&self, payload: UserPayload) -> UserResult<UserResponse> {
        let user = self.insert(payload, Operation::Create).await?;
        Ok(user.into())
    }

    /// Anonymous sign-up: create the user and hand back its token
    pub async fn register(&self, payload: UserPayload) -> UserResult<Registration> {
        let user = self.insert(payload, Operation::Register).await?;
        let token = match self.tokens.get_or_create(user.id).await {
            Ok(token) => token,
            Err(err) => {
                // Undo the insert so the same username and email can register again
                if let Err(cleanup) = self.repository.delete(user.id).await {
                    tracing::error!(
                        user_id = %user.id,
                        error = %cleanup,
                        "Failed to roll back registration"
                    );
                }
                return Err(err);
            }
        };

        AccountMetrics::record_registration();

        Ok(Registration {
            token: token.key,
            user: user.into(),
        })
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: Uuid) -> UserResult<UserResponse> {
        let user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        Ok(user.into())
    }

    /// List users matching the exact-match filters, in the requested order
    pub async fn list_users(&self, query: UserListQuery) -> UserResult<Vec<UserResponse>> {
        let (filter, ordering) = query.into_parts()?;
        let users = self.repository.list(filter, &ordering).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// PUT when `partial` is false, PATCH otherwise
    pub async fn update_user(
        &self,
        id: Uuid,
        payload: UserPayload,
        partial: bool,
    ) -> UserResult<UserResponse> {
        let mut user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        let mode = if partial {
            ValidationMode::Partial
        } else {
            ValidationMode::Replace
        };

        let changes = self
            .validate(payload, mode, Some(id), Operation::Update)
            .await?;
        let password_hash = changes
            .password
            .as_deref()
            .map(|password| self.hash_password(password))
            .transpose()?;

        user.apply_changes(changes, password_hash);

        let updated = self.repository.update(user).await?;
        Ok(updated.into())
    }

    /// Delete a user along with its tokens
    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        let deleted = self.repository.delete(id).await?;

        if !deleted {
            return Err(UserError::NotFound(id));
        }

        self.tokens.revoke(id).await?;
        Ok(())
    }

    /// Resolve a token key to an active user
    pub async fn authenticate(&self, key: &str) -> UserResult<User> {
        let user_id = self
            .tokens
            .user_for_token(key)
            .await?
            .ok_or(UserError::Unauthorized)?;

        match self.repository.get_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(UserError::Unauthorized),
        }
    }

    async fn insert(&self, payload: UserPayload, operation: Operation) -> UserResult<User> {
        let changes = self
            .validate(payload, ValidationMode::Create, None, operation)
            .await?;

        // Create mode guarantees these are present
        let (Some(username), Some(email), Some(password)) =
            (changes.username, changes.email, changes.password)
        else {
            return Err(UserError::Internal(
                "validated payload is missing required fields".to_string(),
            ));
        };

        let password_hash = self.hash_password(&password)?;
        let user = User::new(
            username,
            email,
            changes.first_name.unwrap_or_default(),
            changes.last_name.unwrap_or_default(),
            password_hash,
        );

        self.repository.create(user).await
    }

    /// Normalize, run the field rules, the uniqueness pre-check and finally
    /// the password match. All field errors are reported together.
    async fn validate(
        &self,
        payload: UserPayload,
        mode: ValidationMode,
        exclude: Option<Uuid>,
        operation: Operation,
    ) -> UserResult<UserChanges> {
        let payload = payload.normalized();
        let mut errors = validation::validate_fields(&payload, mode);

        for (field, value) in [
            (UniqueField::Username, &payload.username),
            (UniqueField::Email, &payload.email),
        ] {
            let Some(value) = value.as_deref() else {
                continue;
            };
            if errors.contains(field.as_ref()) {
                continue;
            }
            if self.repository.is_taken(field, value, exclude).await? {
                errors.add(field.as_ref(), UNIQUE);
            }
        }

        if errors.is_empty() {
            errors = validation::check_password_match(&payload);
        }

        if !errors.is_empty() {
            return Err(self.rejected(errors, operation));
        }

        Ok(payload.into())
    }

    fn rejected(&self, errors: FieldErrors, operation: Operation) -> UserError {
        AccountMetrics::record_validation_failures(operation, errors.fields());
        tracing::debug!(operation = operation.as_str(), ?errors, "Rejected user payload");
        UserError::Validation(errors)
    }

    // Password helpers

    fn hash_password(&self, password: &str) -> UserResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserError::PasswordHash(e.to_string()))
    }
}

#[async_trait]
impl<R, T> TokenAuthenticator for UserService<R, T>
where
    R: UserRepository + 'static,
    T: TokenStore + 'static,
{
    async fn authenticate(&self, token: &str) -> Result<Option<AuthenticatedUser>, AppError> {
        match UserService::authenticate(self, token).await {
            Ok(user) => Ok(Some(AuthenticatedUser {
                user_id: user.id,
                username: user.username,
            })),
            Err(UserError::Unauthorized) => Ok(None),
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryUserRepository;
    use crate::tokens::{AuthToken, InMemoryTokenStore, MockTokenStore};
    use argon2::{PasswordHash, PasswordVerifier};
    use mockall::predicate::eq;

    fn payload(username: &str, email: &str) -> UserPayload {
        UserPayload {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some("newpassword".to_string()),
            password2: Some("newpassword".to_string()),
            first_name: Some("New".to_string()),
            last_name: Some("User".to_string()),
            ..Default::default()
        }
    }

    fn service() -> UserService<InMemoryUserRepository, InMemoryTokenStore> {
        UserService::new(InMemoryUserRepository::new(), InMemoryTokenStore::new())
    }

    fn validation_errors(err: UserError) -> FieldErrors {
        match err {
            UserError::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_fields() {
        let service = service();
        let created = service
            .create_user(payload("newuser", "new@example.com"))
            .await
            .unwrap();

        let fetched = service.get_user(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.username, "newuser");
        assert_eq!(fetched.first_name, "New");
    }

    #[tokio::test]
    async fn test_password_is_hashed_with_argon2() {
        let repository = InMemoryUserRepository::new();
        let service = UserService::new(repository.clone(), InMemoryTokenStore::new());
        let created = service
            .create_user(payload("hashme", "hash@example.com"))
            .await
            .unwrap();

        let stored = repository.get_by_id(created.id).await.unwrap().unwrap();
        assert!(stored.password_hash.starts_with("$argon2"));

        let parsed = PasswordHash::new(&stored.password_hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"newpassword", &parsed)
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_rejected() {
        let service = service();
        service
            .create_user(payload("taken", "taken@example.com"))
            .await
            .unwrap();

        let err = service
            .create_user(payload("taken", "TAKEN@Example.com"))
            .await
            .unwrap_err();
        let errors = validation_errors(err);
        assert_eq!(errors.get("username").unwrap(), [UNIQUE]);
        // local part is case sensitive, so only the username clashes
        assert!(!errors.contains("email"));

        let err = service
            .create_user(payload("other", "taken@EXAMPLE.COM"))
            .await
            .unwrap_err();
        assert_eq!(validation_errors(err).get("email").unwrap(), [UNIQUE]);

        let all = service.list_users(UserListQuery::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_password_mismatch_only_checked_on_clean_payload() {
        let service = service();
        let mut input = payload("abc", "new@example.com");
        input.password2 = Some("different1".to_string());

        let errors = validation_errors(service.create_user(input.clone()).await.unwrap_err());
        assert!(errors.contains("username"));
        assert!(!errors.contains("password"));

        input.username = Some("abcd".to_string());
        let errors = validation_errors(service.create_user(input).await.unwrap_err());
        assert_eq!(
            errors.get("password").unwrap(),
            ["Password fields didn't match."]
        );
    }

    #[tokio::test]
    async fn test_register_issues_token_via_store() {
        let mut tokens = MockTokenStore::new();
        tokens.expect_get_or_create().times(1).returning(|user_id| {
            Ok(AuthToken {
                key: "a".repeat(40),
                user_id,
                created_at: chrono::Utc::now(),
            })
        });

        let service = UserService::new(InMemoryUserRepository::new(), tokens);
        let registration = service
            .register(payload("newuser", "new@example.com"))
            .await
            .unwrap();

        assert_eq!(registration.token, "a".repeat(40));
        assert_eq!(registration.user.username, "newuser");
    }

    #[tokio::test]
    async fn test_register_token_failure_leaves_no_user_behind() {
        let mut tokens = MockTokenStore::new();
        tokens
            .expect_get_or_create()
            .times(1)
            .returning(|_| Err(UserError::Internal("token store unavailable".to_string())));

        let repository = InMemoryUserRepository::new();
        let service = UserService::new(repository.clone(), tokens);
        let err = service
            .register(payload("newuser", "new@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::Internal(_)));
        assert!(service.list_users(UserListQuery::default()).await.unwrap().is_empty());
        assert!(
            !repository
                .is_taken(UniqueField::Username, "newuser", None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_register_invalid_payload_never_touches_token_store() {
        let mut tokens = MockTokenStore::new();
        tokens.expect_get_or_create().never();

        let service = UserService::new(InMemoryUserRepository::new(), tokens);
        let err = service
            .register(payload("x", "new@example.com"))
            .await
            .unwrap_err();

        assert!(validation_errors(err).contains("username"));
    }

    #[tokio::test]
    async fn test_delete_revokes_tokens() {
        let repository = InMemoryUserRepository::new();
        let created = repository
            .create(User::new(
                "doomed".to_string(),
                "doomed@example.com".to_string(),
                String::new(),
                String::new(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        let mut tokens = MockTokenStore::new();
        tokens
            .expect_revoke()
            .with(eq(created.id))
            .times(1)
            .returning(|_| Ok(()));

        let service = UserService::new(repository, tokens);
        service.delete_user(created.id).await.unwrap();

        let err = service.delete_user(created.id).await.unwrap_err();
        assert!(matches!(err, UserError::NotFound(id) if id == created.id));
    }

    #[tokio::test]
    async fn test_partial_update_changes_only_supplied_fields() {
        let service = service();
        let created = service
            .create_user(payload("patchme", "patch@example.com"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                created.id,
                UserPayload {
                    first_name: Some("Patched".to_string()),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.first_name, "Patched");
        assert_eq!(updated.username, "patchme");
        assert_eq!(updated.last_name, "User");
    }

    #[tokio::test]
    async fn test_update_keeps_own_username() {
        let service = service();
        let created = service
            .create_user(payload("sameuser", "same@example.com"))
            .await
            .unwrap();

        let updated = service
            .update_user(created.id, payload("sameuser", "same@example.com"), false)
            .await
            .unwrap();
        assert_eq!(updated.username, "sameuser");
    }

    #[tokio::test]
    async fn test_update_mismatched_passwords_leaves_record() {
        let service = service();
        let created = service
            .create_user(payload("stable", "stable@example.com"))
            .await
            .unwrap();

        let mut input = payload("renamed", "renamed@example.com");
        input.password2 = Some("mismatch99".to_string());
        let err = service
            .update_user(created.id, input, false)
            .await
            .unwrap_err();
        assert!(validation_errors(err).contains("password"));

        let unchanged = service.get_user(created.id).await.unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found_before_validation() {
        let service = service();
        let id = Uuid::now_v7();

        let err = service
            .update_user(id, UserPayload::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_ordering() {
        let service = service();
        let err = service
            .list_users(UserListQuery {
                ordering: Some("password".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::InvalidOrdering(_)));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let repository = InMemoryUserRepository::new();
        let service = UserService::new(repository.clone(), InMemoryTokenStore::new());
        let registration = service
            .register(payload("authme", "auth@example.com"))
            .await
            .unwrap();

        let user = service.authenticate(&registration.token).await.unwrap();
        assert_eq!(user.id, registration.user.id);

        assert!(matches!(
            service.authenticate("nope").await,
            Err(UserError::Unauthorized)
        ));

        let mut stored = repository
            .get_by_id(registration.user.id)
            .await
            .unwrap()
            .unwrap();
        stored.is_active = false;
        repository.update(stored).await.unwrap();

        let resolved = TokenAuthenticator::authenticate(&service, &registration.token)
            .await
            .unwrap();
        assert!(resolved.is_none());
    }
}
