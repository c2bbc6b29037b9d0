use anyhow::{bail, Result};
use rusqlite::types::Value;
use tracing::{debug, info};

use crate::db::{Database, Filter};
use crate::error::FinanceError;
use crate::models::{Budget, Expense};
use crate::validate::{
    check_budget_name, check_budget_value, generate_id, is_valid_month, month_bounds,
    normalize_month, today,
};

/// Validate and persist a budget.
///
/// A budget carrying the "new" id is inserted under a fresh id. Otherwise
/// only its name and value are written; month and id never change after
/// creation. A name change is carried over to the month's expenses.
pub(crate) fn save_budget(db: &Database, budget: &Budget) -> Result<Budget> {
    check_budget_name(&budget.name)?;
    let value = check_budget_value(Some(budget.value))?;

    if budget.is_new() {
        let month = normalize_month(&budget.month, today());
        ensure_unique(db, &budget.name, &month, None)?;
        let created = Budget {
            id: generate_id(),
            name: budget.name.clone(),
            month,
            value,
        };
        db.insert(&created)?;
        info!(id = %created.id, name = %created.name, month = %created.month, "created budget");
        return Ok(created);
    }

    let existing: Budget = db.get(&budget.id)?.ok_or_else(|| FinanceError::NotFound {
        kind: "budget",
        id: budget.id.clone(),
    })?;
    ensure_unique(db, &budget.name, &existing.month, Some(&existing.id))?;

    let updated: Budget = db.update(
        &existing.id,
        &[
            ("name", Value::Text(budget.name.clone())),
            ("value", Value::Text(value.to_string())),
        ],
    )?;

    if existing.name != updated.name {
        let renamed = rename_cascade(db, &existing.month, &existing.name, &updated.name)?;
        info!(
            id = %updated.id,
            from = %existing.name,
            to = %updated.name,
            expenses = renamed,
            "renamed budget"
        );
    }
    Ok(updated)
}

fn ensure_unique(db: &Database, name: &str, month: &str, except: Option<&str>) -> Result<()> {
    let mut filters = vec![Filter::eq("month", month), Filter::eq("name", name)];
    if let Some(id) = except {
        filters.push(Filter::not_id(id));
    }
    if db.find_one::<Budget>(&filters)?.is_some() {
        return Err(FinanceError::DuplicateBudget {
            name: name.to_string(),
            month: month.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Retag every expense of `month` filed under `from` as `to`.
///
/// Each expense is its own write; if this stops halfway, running it again
/// finishes the job.
pub(crate) fn rename_cascade(db: &Database, month: &str, from: &str, to: &str) -> Result<usize> {
    let (first, last) = month_bounds(month);
    let affected: Vec<Expense> = db.find_many(&[
        Filter::between("date", first, last),
        Filter::eq("budget", from),
    ])?;
    for expense in &affected {
        db.update::<Expense>(&expense.id, &[("budget", Value::Text(to.to_string()))])?;
    }
    Ok(affected.len())
}

/// Delete a budget nobody spends against.
///
/// A budget with expenses can only go when a second row with the same
/// month and name exists, which is how sync duplicates get cleaned up.
pub(crate) fn delete_budget(db: &Database, id: &str) -> Result<()> {
    let budget: Budget = db.get(id)?.ok_or_else(|| FinanceError::NotFound {
        kind: "budget",
        id: id.to_string(),
    })?;

    let (first, last) = month_bounds(&budget.month);
    let referencing = db.count::<Expense>(&[
        Filter::between("date", first, last),
        Filter::eq("budget", budget.name.as_str()),
    ])?;

    if referencing > 0 {
        let copies = db.count::<Budget>(&[
            Filter::eq("month", budget.month.as_str()),
            Filter::eq("name", budget.name.as_str()),
        ])?;
        match copies {
            2 => debug!(id, name = %budget.name, "removing duplicate budget"),
            0 | 1 => {
                return Err(FinanceError::BudgetHasExpenses {
                    name: budget.name,
                    month: budget.month,
                }
                .into())
            }
            count => {
                return Err(FinanceError::AmbiguousDuplicates {
                    name: budget.name,
                    month: budget.month,
                    count,
                }
                .into())
            }
        }
    }

    db.remove::<Budget>(id)?;
    info!(id, name = %budget.name, month = %budget.month, "deleted budget");
    Ok(())
}

/// Budgets of one month, sorted by name.
pub(crate) fn budgets_for_month(db: &Database, month: &str) -> Result<Vec<Budget>> {
    let mut budgets: Vec<Budget> = db.find_many(&[Filter::eq("month", month)])?;
    budgets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Ok(budgets)
}

/// Clone every budget of `origin` into `destination` under fresh ids.
///
/// Whether a month should be seeded at all is the caller's call; this only
/// does the copy.
pub(crate) fn copy_budgets(db: &Database, origin: &str, destination: &str) -> Result<Vec<Budget>> {
    if !is_valid_month(destination) {
        bail!("Invalid destination month: {destination}");
    }
    let originals: Vec<Budget> = db.find_many(&[Filter::eq("month", origin)])?;
    let copies: Vec<Budget> = originals
        .into_iter()
        .map(|b| Budget {
            id: generate_id(),
            month: destination.to_string(),
            ..b
        })
        .collect();
    db.bulk_insert(&copies)?;
    info!(origin, destination, count = copies.len(), "copied budgets");
    Ok(copies)
}
