mod budget;
mod expense;

pub use budget::Budget;
pub use expense::Expense;

use rust_decimal::Decimal;

/// Id carried by a record that has not been persisted yet.
pub const NEW_ID: &str = "new";

/// Computed aggregate row; never a real budget.
pub const TOTAL: &str = "Total";

/// Budget that unclassified expenses fall back to.
pub const MISC: &str = "Misc";

/// Value given to budgets created on the fly for an expense.
pub const DEFAULT_BUDGET_VALUE: Decimal = Decimal::ONE_HUNDRED;

#[cfg(test)]
mod tests;
