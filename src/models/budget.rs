use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::NEW_ID;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub name: String,
    /// Format: "YYYY-MM"
    pub month: String,
    pub value: Decimal,
}

impl Budget {
    pub fn new(name: String, month: String, value: Decimal) -> Self {
        Self {
            id: NEW_ID.to_string(),
            name,
            month,
            value,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == NEW_ID
    }

    /// Whether this budget is the one an expense dated `date` and tagged
    /// `budget` resolves to.
    pub fn covers(&self, date: &str, budget: &str) -> bool {
        date.get(..7) == Some(self.month.as_str()) && self.name == budget
    }
}
