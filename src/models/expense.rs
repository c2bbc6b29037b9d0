use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::NEW_ID;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub cost: Decimal,
    /// Format: "YYYY-MM-DD"
    pub date: String,
    /// Name of the budget this expense counts against, within its month.
    pub budget: String,
}

impl Expense {
    pub fn new(description: String, cost: Decimal, date: String, budget: String) -> Self {
        Self {
            id: NEW_ID.to_string(),
            description,
            cost,
            date,
            budget,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == NEW_ID
    }

    /// The "YYYY-MM" month this expense falls in.
    pub fn month(&self) -> &str {
        self.date.get(..7).unwrap_or(&self.date)
    }
}
