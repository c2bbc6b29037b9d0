//! Business-rule failures raised by the consistency engine.
//!
//! These travel inside `anyhow::Error` like every other failure in the crate;
//! callers that need to tell them apart use `downcast_ref::<FinanceError>()`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum FinanceError {
    #[error("Budget name \"Total\" is reserved")]
    ReservedName,

    #[error("Budget name cannot be empty")]
    EmptyName,

    #[error("Budget value must be a number greater than zero")]
    InvalidValue,

    #[error("Expense description cannot be empty")]
    EmptyDescription,

    #[error("Expense cost must be a number greater than zero")]
    InvalidCost,

    #[error("A budget named \"{name}\" already exists for {month}")]
    DuplicateBudget { name: String, month: String },

    #[error("Budget \"{name}\" for {month} still has expenses")]
    BudgetHasExpenses { name: String, month: String },

    /// More than one spare copy of a budget row exists; picking which one to
    /// keep would be a guess.
    #[error("Found {count} budgets named \"{name}\" for {month}; resolve the duplicates manually")]
    AmbiguousDuplicates {
        name: String,
        month: String,
        count: usize,
    },

    #[error("No {kind} with id {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("The local store is not available")]
    StoreUnavailable,

    #[error("Invalid sync token: {0}")]
    InvalidSyncToken(String),
}
