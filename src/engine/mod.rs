//! Cross-record rules: validated saves, the rename cascade, guarded
//! deletes and month rollover.
//!
//! Every write the application makes goes through here; the store below
//! never sees an unvalidated budget or expense.

mod budgets;
mod expenses;
mod summary;

pub(crate) use budgets::{budgets_for_month, copy_budgets, delete_budget, save_budget};
pub(crate) use expenses::{delete_expense, expenses_between, expenses_for_month, save_expense};
pub(crate) use summary::month_summary;
