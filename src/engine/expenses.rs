use anyhow::Result;
use rusqlite::types::Value;
use tracing::info;

use super::budgets::save_budget;
use crate::db::{Database, Filter};
use crate::error::FinanceError;
use crate::models::{Budget, Expense, DEFAULT_BUDGET_VALUE, MISC};
use crate::validate::{
    check_cost, check_description, generate_id, month_bounds, month_of, normalize_date, today,
};

/// Validate and persist an expense, making sure its budget exists.
///
/// A new expense without a budget (or filed under the fallback) borrows the
/// budget of the latest expense with the same description, if there is
/// one.
pub(crate) fn save_expense(db: &Database, expense: &Expense) -> Result<Expense> {
    check_description(&expense.description)?;
    let cost = check_cost(Some(expense.cost))?;
    let date = normalize_date(&expense.date, today());
    if !expense.is_new() && db.get::<Expense>(&expense.id)?.is_none() {
        return Err(FinanceError::NotFound {
            kind: "expense",
            id: expense.id.clone(),
        }
        .into());
    }

    let mut budget = expense.budget.trim().to_string();
    if expense.is_new() && (budget.is_empty() || budget == MISC) {
        if let Some(previous) = latest_with_description(db, &expense.description)? {
            budget = previous.budget;
        }
    }
    if budget.is_empty() {
        budget = MISC.to_string();
    }

    ensure_budget(db, month_of(&date), &budget)?;

    if expense.is_new() {
        let created = Expense {
            id: generate_id(),
            description: expense.description.clone(),
            cost,
            date,
            budget,
        };
        db.insert(&created)?;
        info!(id = %created.id, budget = %created.budget, date = %created.date, "created expense");
        return Ok(created);
    }

    let updated: Expense = db.update(
        &expense.id,
        &[
            ("cost", Value::Text(cost.to_string())),
            ("description", Value::Text(expense.description.clone())),
            ("budget", Value::Text(budget)),
            ("date", Value::Text(date)),
        ],
    )?;
    info!(id = %updated.id, "updated expense");
    Ok(updated)
}

fn latest_with_description(db: &Database, description: &str) -> Result<Option<Expense>> {
    let matches: Vec<Expense> = db.find_many(&[Filter::eq("description", description)])?;
    Ok(matches.into_iter().max_by(|a, b| a.date.cmp(&b.date)))
}

/// Create the budget an expense points at if its month lacks one.
fn ensure_budget(db: &Database, month: &str, name: &str) -> Result<()> {
    let existing: Option<Budget> =
        db.find_one(&[Filter::eq("month", month), Filter::eq("name", name)])?;
    if existing.is_none() {
        save_budget(
            db,
            &Budget::new(name.to_string(), month.to_string(), DEFAULT_BUDGET_VALUE),
        )?;
    }
    Ok(())
}

pub(crate) fn delete_expense(db: &Database, id: &str) -> Result<()> {
    if db.get::<Expense>(id)?.is_none() {
        return Err(FinanceError::NotFound {
            kind: "expense",
            id: id.to_string(),
        }
        .into());
    }
    db.remove::<Expense>(id)?;
    info!(id, "deleted expense");
    Ok(())
}

/// Expenses dated within `[from, to]`, newest first.
pub(crate) fn expenses_between(db: &Database, from: &str, to: &str) -> Result<Vec<Expense>> {
    let mut expenses: Vec<Expense> = db.find_many(&[Filter::between("date", from, to)])?;
    expenses.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    Ok(expenses)
}

pub(crate) fn expenses_for_month(db: &Database, month: &str) -> Result<Vec<Expense>> {
    let (first, last) = month_bounds(month);
    expenses_between(db, &first, &last)
}
