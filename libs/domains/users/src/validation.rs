//! Field rules for user payloads.
//!
//! Every applicable rule runs and all failures are collected. The
//! uniqueness check needs the store and lives in the service; the password
//! match check runs last and only on an otherwise clean payload.

use regex::Regex;
use std::sync::LazyLock;
use validator::ValidateEmail;

use crate::error::FieldErrors;
use crate::models::{UserChanges, UserPayload};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const LETTERS_ONLY: &str = "Only letters are allowed.";
pub const UNIQUE: &str = "This field must be unique.";
pub const PASSWORD_MISMATCH: &str = "Password fields didn't match.";
pub const NOT_A_STRING: &str = "Not a valid string.";

pub const USERNAME_MIN: usize = 4;
pub const USERNAME_MAX: usize = 32;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 8;
pub const NAME_MAX: usize = 150;

static LETTERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Register and create: every field required, names may be empty
    Create,
    /// PUT: same requirements as create
    Replace,
    /// PATCH: only supplied fields are checked
    Partial,
}

impl ValidationMode {
    fn requires_all(self) -> bool {
        !matches!(self, ValidationMode::Partial)
    }
}

fn min_length(n: usize) -> String {
    format!("Ensure this field has at least {} characters.", n)
}

fn max_length(n: usize) -> String {
    format!("Ensure this field has no more than {} characters.", n)
}

impl UserPayload {
    /// Trims every value and lower-cases the domain part of the email.
    pub fn normalized(self) -> Self {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());

        Self {
            username: trim(self.username),
            email: trim(self.email).map(|email| normalize_email(&email)),
            password: trim(self.password),
            password2: trim(self.password2),
            first_name: trim(self.first_name),
            last_name: trim(self.last_name),
            type_errors: self.type_errors,
        }
    }
}

/// `John@Example.COM` -> `John@example.com`. The local part is left alone.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Returns the value if it is present and not blank, recording an error otherwise.
fn present<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: &'a Option<String>,
    mode: ValidationMode,
) -> Option<&'a str> {
    // already rejected for its JSON type
    if errors.contains(field) {
        return None;
    }
    match value.as_deref() {
        None => {
            if mode.requires_all() {
                errors.add(field, REQUIRED);
            }
            None
        }
        Some("") => {
            errors.add(field, BLANK);
            None
        }
        Some(v) => Some(v),
    }
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str, min: usize, max: Option<usize>) {
    let len = value.chars().count();
    if len < min {
        errors.add(field, min_length(min));
    }
    if let Some(max) = max.filter(|&max| len > max) {
        errors.add(field, max_length(max));
    }
}

/// Names are required like every other field outside partial mode, but
/// unlike them may be empty.
fn check_name(
    errors: &mut FieldErrors,
    field: &str,
    value: &Option<String>,
    mode: ValidationMode,
) {
    if errors.contains(field) {
        return;
    }
    let Some(value) = value.as_deref() else {
        if mode.requires_all() {
            errors.add(field, REQUIRED);
        }
        return;
    };
    if !LETTERS.is_match(value) {
        errors.add(field, LETTERS_ONLY);
    }
    if value.chars().count() > NAME_MAX {
        errors.add(field, max_length(NAME_MAX));
    }
}

/// Runs the per-field rules on a normalized payload.
pub fn validate_fields(payload: &UserPayload, mode: ValidationMode) -> FieldErrors {
    let mut errors = payload.type_errors.clone();

    if let Some(username) = present(&mut errors, "username", &payload.username, mode) {
        check_length(&mut errors, "username", username, USERNAME_MIN, Some(USERNAME_MAX));
    }

    if let Some(email) = present(&mut errors, "email", &payload.email, mode) {
        if !email.validate_email() {
            errors.add("email", INVALID_EMAIL);
        }
        if email.chars().count() > EMAIL_MAX {
            errors.add("email", max_length(EMAIL_MAX));
        }
    }

    // PATCH may leave both passwords out, but not just one of them
    let password_mode = if mode == ValidationMode::Partial
        && (payload.password.is_some() || payload.password2.is_some())
    {
        ValidationMode::Replace
    } else {
        mode
    };
    for (field, value) in [
        ("password", &payload.password),
        ("password2", &payload.password2),
    ] {
        if let Some(password) = present(&mut errors, field, value, password_mode) {
            check_length(&mut errors, field, password, PASSWORD_MIN, None);
        }
    }

    check_name(&mut errors, "first_name", &payload.first_name, mode);
    check_name(&mut errors, "last_name", &payload.last_name, mode);

    errors
}

/// Cross-field check, run once every field rule has passed.
pub fn check_password_match(payload: &UserPayload) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if let (Some(password), Some(confirmation)) = (&payload.password, &payload.password2) {
        if password != confirmation {
            errors.add("password", PASSWORD_MISMATCH);
        }
    }
    errors
}

impl From<UserPayload> for UserChanges {
    fn from(payload: UserPayload) -> Self {
        Self {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        }
    }
}
