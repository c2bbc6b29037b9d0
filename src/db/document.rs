use rusqlite::types::Value;
use rusqlite::Row;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::str::FromStr;

use crate::models::{Budget, Expense};

/// The two record kinds the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Collection {
    Budgets,
    Expenses,
}

impl Collection {
    pub(crate) fn all() -> &'static [Collection] {
        &[Self::Budgets, Self::Expenses]
    }

    /// Table name locally, path segment remotely.
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Budgets => "budgets",
            Self::Expenses => "expenses",
        }
    }

    /// Singular noun used in messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Budgets => "budget",
            Self::Expenses => "expense",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record type that can live in the document store.
///
/// Rows are laid out as `id` followed by `FIELDS`, in that order, both in
/// `values()` and in what `from_row` reads.
pub(crate) trait Document: Clone + Serialize + DeserializeOwned + Send + 'static {
    const COLLECTION: Collection;
    const FIELDS: &'static [&'static str];

    fn id(&self) -> &str;
    fn values(&self) -> Vec<Value>;

    /// Read a document whose `id` column sits at `offset`.
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self>;

    fn has_field(field: &str) -> bool {
        field == "id" || Self::FIELDS.contains(&field)
    }
}

/// Read an amount column; text that is not a decimal is a conversion error.
fn decimal(row: &Row<'_>, index: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(index)?;
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl Document for Budget {
    const COLLECTION: Collection = Collection::Budgets;
    const FIELDS: &'static [&'static str] = &["name", "month", "value"];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            Value::Text(self.month.clone()),
            Value::Text(self.value.to_string()),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Budget {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            month: row.get(offset + 2)?,
            value: decimal(row, offset + 3)?,
        })
    }
}

impl Document for Expense {
    const COLLECTION: Collection = Collection::Expenses;
    const FIELDS: &'static [&'static str] = &["description", "cost", "date", "budget"];

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.description.clone()),
            Value::Text(self.cost.to_string()),
            Value::Text(self.date.clone()),
            Value::Text(self.budget.clone()),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Expense {
            id: row.get(offset)?,
            description: row.get(offset + 1)?,
            cost: decimal(row, offset + 2)?,
            date: row.get(offset + 3)?,
            budget: row.get(offset + 4)?,
        })
    }
}

/// Query predicates the application needs. Filters passed together are
/// combined with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Filter {
    /// Exact match on a field.
    Eq(&'static str, String),
    /// Inclusive range on a field.
    Between(&'static str, String, String),
    /// Everything except the record with this id.
    NotId(String),
}

impl Filter {
    pub(crate) fn eq(field: &'static str, value: impl Into<String>) -> Self {
        Self::Eq(field, value.into())
    }

    pub(crate) fn between(
        field: &'static str,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        Self::Between(field, low.into(), high.into())
    }

    pub(crate) fn not_id(id: impl Into<String>) -> Self {
        Self::NotId(id.into())
    }

    pub(crate) fn field(&self) -> &'static str {
        match self {
            Self::Eq(field, _) | Self::Between(field, _, _) => field,
            Self::NotId(_) => "id",
        }
    }
}
