//! Counters for the user-account domain.

use metrics::counter;

pub const REGISTRATIONS_TOTAL: &str = "accounts_registrations_total";
pub const USER_OPERATIONS_TOTAL: &str = "accounts_user_operations_total";
pub const VALIDATION_FAILURES_TOTAL: &str = "accounts_validation_failures_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Create,
    Retrieve,
    List,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Create => "create",
            Operation::Retrieve => "retrieve",
            Operation::List => "list",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Invalid,
    NotFound,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Invalid => "invalid",
            Outcome::NotFound => "not_found",
            Outcome::Error => "error",
        }
    }
}

pub struct AccountMetrics;

impl AccountMetrics {
    pub fn record_registration() {
        counter!(REGISTRATIONS_TOTAL).increment(1);
    }

    pub fn record_operation(operation: Operation, outcome: Outcome) {
        counter!(
            USER_OPERATIONS_TOTAL,
            "operation" => operation.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }

    /// One increment per rejected field, so dashboards show which rules users trip over.
    pub fn record_validation_failures<'a>(
        operation: Operation,
        fields: impl IntoIterator<Item = &'a str>,
    ) {
        for field in fields {
            counter!(
                VALIDATION_FAILURES_TOTAL,
                "operation" => operation.as_str(),
                "field" => field.to_string()
            )
            .increment(1);
        }

        tracing::debug!(operation = operation.as_str(), "validation failures recorded");
    }
}
