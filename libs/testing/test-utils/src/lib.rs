//! Shared test utilities for the accounts workspace.
//!
//! - `TestDatabase`: PostgreSQL container with the SeaORM migrations applied (feature: "postgres")
//! - `TestDataBuilder`: deterministic, rule-abiding account data
//! - `assertions`: small assertion helpers
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! #[ignore = "needs a Docker daemon"]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let data = TestDataBuilder::from_test_name("my_postgres_test");
//!
//!     let username = data.username("owner");
//!     let email = data.email("owner");
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

/// Deterministic test data derived from a seed.
///
/// Generated usernames stay within 4..=32 characters and emails are
/// syntactically valid, so they pass account validation as-is.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the test name, so each test gets its own stable data.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let data = TestDataBuilder::from_test_name("test_register");
    /// assert_eq!(data.username("a"), TestDataBuilder::from_test_name("test_register").username("a"));
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn user_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// `u<8 hex digits><suffix>`; keep `suffix` under 24 characters.
    pub fn username(&self, suffix: &str) -> String {
        format!("u{:08x}{}", self.seed as u32, suffix)
    }

    pub fn email(&self, suffix: &str) -> String {
        format!("{}@example.com", self.username(suffix))
    }

    /// A letters-only name, as required for first and last names.
    pub fn first_name(&self) -> String {
        const NAMES: [&str; 6] = ["Alice", "Bob", "Charlie", "Dana", "Eve", "Frank"];
        NAMES[(self.seed % NAMES.len() as u64) as usize].to_string()
    }
}

pub mod assertions {
    use uuid::Uuid;

    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(
            actual, expected,
            "{}: expected UUID {}, got {}",
            context, expected, actual
        );
    }

    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
