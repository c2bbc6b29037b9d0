use anyhow::Result;
use rust_decimal::Decimal;

use super::{budgets_for_month, expenses_for_month};
use crate::db::Database;
use crate::models::TOTAL;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BudgetUsage {
    pub name: String,
    pub allocated: Decimal,
    pub spent: Decimal,
}

impl BudgetUsage {
    pub(crate) fn remaining(&self) -> Decimal {
        self.allocated - self.spent
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MonthSummary {
    pub month: String,
    pub rows: Vec<BudgetUsage>,
    /// Sum of every row, named after the reserved aggregate.
    pub total: BudgetUsage,
}

/// Spending against each budget of `month`, plus the computed total.
///
/// Duplicate budget rows are shown once. Expenses whose budget is missing
/// get a row with nothing allocated.
pub(crate) fn month_summary(db: &Database, month: &str) -> Result<MonthSummary> {
    let budgets = budgets_for_month(db, month)?;
    let expenses = expenses_for_month(db, month)?;

    let mut rows: Vec<BudgetUsage> = Vec::new();
    for budget in &budgets {
        if rows.iter().any(|r| r.name == budget.name) {
            continue;
        }
        rows.push(BudgetUsage {
            name: budget.name.clone(),
            allocated: budget.value,
            spent: expenses
                .iter()
                .filter(|e| budget.covers(&e.date, &e.budget))
                .map(|e| e.cost)
                .sum(),
        });
    }

    let orphans = expenses
        .iter()
        .filter(|e| !budgets.iter().any(|b| b.covers(&e.date, &e.budget)));
    for expense in orphans {
        match rows.iter_mut().find(|r| r.name == expense.budget) {
            Some(row) => row.spent += expense.cost,
            None => rows.push(BudgetUsage {
                name: expense.budget.clone(),
                allocated: Decimal::ZERO,
                spent: expense.cost,
            }),
        }
    }
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    let total = BudgetUsage {
        name: TOTAL.to_string(),
        allocated: rows.iter().map(|r| r.allocated).sum(),
        spent: rows.iter().map(|r| r.spent).sum(),
    };
    Ok(MonthSummary {
        month: month.to_string(),
        rows,
        total,
    })
}
