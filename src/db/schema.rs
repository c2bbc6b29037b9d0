use super::document::Collection;

pub(crate) const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub(crate) const BUDGETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS budgets (
    id       TEXT PRIMARY KEY NOT NULL,
    rev      TEXT NOT NULL,
    seq      INTEGER NOT NULL,
    deleted  BOOLEAN NOT NULL DEFAULT 0,
    name     TEXT NOT NULL DEFAULT '',
    month    TEXT NOT NULL DEFAULT '',
    value    TEXT NOT NULL DEFAULT '0'
);

CREATE INDEX IF NOT EXISTS idx_budgets_month_name ON budgets(month, name);
CREATE INDEX IF NOT EXISTS idx_budgets_seq ON budgets(seq);
"#;

pub(crate) const EXPENSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
    id          TEXT PRIMARY KEY NOT NULL,
    rev         TEXT NOT NULL,
    seq         INTEGER NOT NULL,
    deleted     BOOLEAN NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT '',
    cost        TEXT NOT NULL DEFAULT '0',
    date        TEXT NOT NULL DEFAULT '',
    budget      TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
CREATE INDEX IF NOT EXISTS idx_expenses_description ON expenses(description);
CREATE INDEX IF NOT EXISTS idx_expenses_budget ON expenses(budget);
CREATE INDEX IF NOT EXISTS idx_expenses_seq ON expenses(seq);
"#;

pub(crate) const CHECKPOINTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sync_checkpoints (
    collection TEXT NOT NULL,
    remote     TEXT NOT NULL,
    pulled_seq INTEGER NOT NULL DEFAULT 0,
    pushed_seq INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (collection, remote)
);
"#;

pub(crate) const SEQUENCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sequences (
    collection TEXT PRIMARY KEY NOT NULL,
    seq        INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO sequences (collection, seq) VALUES ('budgets', 0), ('expenses', 0);
"#;

pub(crate) fn table_schema(collection: Collection) -> &'static str {
    match collection {
        Collection::Budgets => BUDGETS_TABLE,
        Collection::Expenses => EXPENSES_TABLE,
    }
}

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[
    // Future migrations go here:
    // (1, "ALTER TABLE expenses ADD COLUMN notes TEXT NOT NULL DEFAULT '';"),
];
