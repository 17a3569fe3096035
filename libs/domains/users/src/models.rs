use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{FieldErrors, UserError, UserResult};
use crate::validation::{NOT_A_STRING, normalize_email};

/// User entity - matches SQL schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUID v7, so ids sort by creation time)
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 password hash (never exposed in API responses)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Inactive users cannot authenticate
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            username,
            email,
            first_name,
            last_name,
            password_hash,
            is_active: true,
            date_joined: now,
            updated_at: now,
        }
    }

    /// Apply validated changes; a new password arrives already hashed.
    pub fn apply_changes(&mut self, changes: UserChanges, password_hash: Option<String>) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(first_name) = changes.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            self.last_name = last_name;
        }
        if let Some(hash) = password_hash {
            self.password_hash = hash;
        }
        self.updated_at = Utc::now();
    }
}

/// Public representation of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "newuser")]
    pub username: String,
    #[schema(example = "new@example.com")]
    pub email: String,
    #[schema(example = "New")]
    pub first_name: String,
    #[schema(example = "User")]
    pub last_name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Request body for register, create, replace and partial update.
///
/// Every field is optional at the type level; which ones are required
/// depends on the [`ValidationMode`](crate::validation::ValidationMode).
/// `null` is the same as leaving a field out. Numbers are taken as their
/// decimal text; any other non-string value is reported in `type_errors`.
#[derive(Clone, Default, Deserialize, ToSchema)]
#[serde(from = "RawUserPayload")]
pub struct UserPayload {
    #[schema(example = "newuser", min_length = 4, max_length = 32)]
    pub username: Option<String>,
    #[schema(example = "new@example.com", max_length = 254)]
    pub email: Option<String>,
    #[schema(example = "newpassword", min_length = 8, write_only)]
    pub password: Option<String>,
    /// Must equal `password`; also accepted as `password_confirmation`
    #[schema(example = "newpassword", min_length = 8, write_only)]
    pub password2: Option<String>,
    #[schema(example = "New", max_length = 150, pattern = "^[a-zA-Z]*$")]
    pub first_name: Option<String>,
    #[schema(example = "User", max_length = 150, pattern = "^[a-zA-Z]*$")]
    pub last_name: Option<String>,
    /// Fields whose JSON value could not be read as text
    #[serde(skip)]
    pub type_errors: FieldErrors,
}

#[derive(Deserialize)]
struct RawUserPayload {
    #[serde(default)]
    username: Option<Value>,
    #[serde(default)]
    email: Option<Value>,
    #[serde(default)]
    password: Option<Value>,
    #[serde(default, alias = "password_confirmation")]
    password2: Option<Value>,
    #[serde(default)]
    first_name: Option<Value>,
    #[serde(default)]
    last_name: Option<Value>,
}

impl From<RawUserPayload> for UserPayload {
    fn from(raw: RawUserPayload) -> Self {
        let mut type_errors = FieldErrors::new();
        let mut text = |field: &str, value: Option<Value>| match value {
            None => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                type_errors.add(field, NOT_A_STRING);
                None
            }
        };

        let username = text("username", raw.username);
        let email = text("email", raw.email);
        let password = text("password", raw.password);
        let password2 = text("password2", raw.password2);
        let first_name = text("first_name", raw.first_name);
        let last_name = text("last_name", raw.last_name);

        Self {
            username,
            email,
            password,
            password2,
            first_name,
            last_name,
            type_errors,
        }
    }
}

impl fmt::Debug for UserPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "***");
        f.debug_struct("UserPayload")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &redacted(&self.password))
            .field("password2", &redacted(&self.password2))
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("type_errors", &self.type_errors)
            .finish()
    }
}

/// Validated field set. `None` leaves the stored value alone.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Raw password, only kept long enough to derive a new hash
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl fmt::Debug for UserChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserChanges")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Response body of `POST /register`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Registration {
    /// 40 hex characters; send as `Authorization: Bearer <token>`
    #[schema(example = "9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b")]
    pub token: String,
    pub user: UserResponse,
}

/// Exact-match filters for listing users
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        fn check(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().is_none_or(|value| value == actual)
        }

        check(&self.username, &user.username)
            && check(&self.email, &user.email)
            && check(&self.first_name, &user.first_name)
            && check(&self.last_name, &user.last_name)
    }
}

/// Columns a listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum OrderField {
    Username,
    Email,
    FirstName,
    LastName,
}

impl OrderField {
    pub fn value<'a>(&self, user: &'a User) -> &'a str {
        match self {
            OrderField::Username => &user.username,
            OrderField::Email => &user.email,
            OrderField::FirstName => &user.first_name,
            OrderField::LastName => &user.last_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: OrderField,
    pub descending: bool,
}

impl FromStr for OrderTerm {
    type Err = UserError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match raw.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, raw),
        };

        let field = name
            .parse()
            .map_err(|_| UserError::InvalidOrdering(raw.to_string()))?;

        Ok(Self { field, descending })
    }
}

/// Parses `first_name,-username` style ordering. Blank segments are skipped.
pub fn parse_ordering(raw: &str) -> UserResult<Vec<OrderTerm>> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::parse::<OrderTerm>)
        .collect()
}

/// Query string of `GET /users`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Exact username
    pub username: Option<String>,
    /// Exact email; the domain part is matched case-insensitively
    pub email: Option<String>,
    /// Exact first name
    pub first_name: Option<String>,
    /// Exact last name
    pub last_name: Option<String>,
    /// Comma separated fields, `-` prefix for descending. Ties fall back to creation order.
    #[param(example = "first_name,-username")]
    pub ordering: Option<String>,
}

impl UserListQuery {
    pub fn into_parts(self) -> UserResult<(UserFilter, Vec<OrderTerm>)> {
        let ordering = match self.ordering.as_deref() {
            Some(raw) => parse_ordering(raw)?,
            None => Vec::new(),
        };

        let filter = UserFilter {
            username: self.username,
            // stored addresses carry a lowercased domain
            email: self.email.as_deref().map(normalize_email),
            first_name: self.first_name,
            last_name: self.last_name,
        };

        Ok((filter, ordering))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, first_name: &str) -> User {
        User::new(
            username.to_string(),
            format!("{}@example.com", username),
            first_name.to_string(),
            String::new(),
            "hash".to_string(),
        )
    }

    #[test]
    fn test_user_response_omits_password_hash() {
        let user = user("alice1", "Alice");
        let json = serde_json::to_value(UserResponse::from(user.clone())).unwrap();

        assert_eq!(json["username"], "alice1");
        assert!(json.get("password_hash").is_none());
        assert_eq!(json.as_object().unwrap().len(), 5);

        let raw = serde_json::to_value(&user).unwrap();
        assert!(raw.get("password_hash").is_none());
    }

    #[test]
    fn test_payload_accepts_password_confirmation_alias() {
        let payload: UserPayload = serde_json::from_value(serde_json::json!({
            "password": "secret123",
            "password_confirmation": "secret123",
            "first_name": null
        }))
        .unwrap();

        assert_eq!(payload.password2.as_deref(), Some("secret123"));
        assert!(payload.first_name.is_none());
    }

    #[test]
    fn test_payload_reads_numbers_as_text_and_flags_other_types() {
        let payload: UserPayload = serde_json::from_value(serde_json::json!({
            "username": 12345,
            "email": true,
            "first_name": ["New"],
            "last_name": {"value": "User"}
        }))
        .unwrap();

        assert_eq!(payload.username.as_deref(), Some("12345"));
        assert!(payload.email.is_none());
        assert_eq!(
            payload.type_errors.fields().collect::<Vec<_>>(),
            vec!["email", "first_name", "last_name"]
        );
        assert_eq!(payload.type_errors.get("email").unwrap(), ["Not a valid string."]);
    }

    #[test]
    fn test_payload_debug_redacts_passwords() {
        let payload = UserPayload {
            password: Some("hunter22".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", payload).contains("hunter22"));
    }

    #[test]
    fn test_list_query_normalizes_email_filter() {
        let query = UserListQuery {
            email: Some("Alice@Example.COM".to_string()),
            ..Default::default()
        };
        let (filter, ordering) = query.into_parts().unwrap();

        assert_eq!(filter.email.as_deref(), Some("Alice@example.com"));
        assert!(ordering.is_empty());
    }

    #[test]
    fn test_parse_ordering() {
        let terms = parse_ordering("first_name, -username,").unwrap();
        assert_eq!(
            terms,
            vec![
                OrderTerm {
                    field: OrderField::FirstName,
                    descending: false
                },
                OrderTerm {
                    field: OrderField::Username,
                    descending: true
                },
            ]
        );
    }

    #[test]
    fn test_parse_ordering_rejects_unknown_field() {
        let err = parse_ordering("password_hash").unwrap_err();
        assert!(matches!(err, UserError::InvalidOrdering(field) if field == "password_hash"));

        assert!(parse_ordering("-id").is_err());
    }

    #[test]
    fn test_filter_is_exact_match() {
        let filter = UserFilter {
            first_name: Some("Charlie".to_string()),
            ..Default::default()
        };

        assert!(filter.matches(&user("charlie", "Charlie")));
        assert!(!filter.matches(&user("charles", "Charles")));
        assert!(!filter.matches(&user("lower", "charlie")));
        assert!(UserFilter::default().matches(&user("anyone", "")));
    }

    #[test]
    fn test_apply_changes_leaves_absent_fields() {
        let mut stored = user("before", "Before");
        let original_hash = stored.password_hash.clone();

        stored.apply_changes(
            UserChanges {
                last_name: Some("After".to_string()),
                ..Default::default()
            },
            None,
        );

        assert_eq!(stored.username, "before");
        assert_eq!(stored.last_name, "After");
        assert_eq!(stored.password_hash, original_hash);
    }
}
