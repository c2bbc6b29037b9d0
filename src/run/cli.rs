use anyhow::{bail, Result};
use std::path::Path;
use std::time::{Duration, Instant};

use super::format::{format_amount, truncate};
use crate::db::Database;
use crate::engine::{
    budgets_for_month, copy_budgets, delete_budget, delete_expense, expenses_between,
    expenses_for_month, month_summary, save_budget, save_expense,
};
use crate::error::FinanceError;
use crate::models::{Budget, Expense, NEW_ID};
use crate::session::{Session, SessionEvent};
use crate::settings::{self, CURRENCY};
use crate::transfer;
use crate::validate::{current_month, is_valid_month, parse_amount, shift_month};

/// Flags that take no value.
const SWITCHES: &[&str] = &["--replace", "--yes"];

pub(crate) fn as_cli(args: &[String], session: &mut Session) -> Result<()> {
    let command = args.get(1).map(String::as_str).unwrap_or("summary");
    let rest = args.get(2..).unwrap_or_default();
    match command {
        "budgets" | "b" => cli_budgets(rest, session),
        "budget-set" => cli_budget_set(rest, session),
        "budget-rm" => cli_budget_rm(rest, session),
        "copy" => cli_copy(rest, session),
        "expenses" | "e" => cli_expenses(rest, session),
        "spend" => cli_spend(rest, session),
        "expense-rm" => cli_expense_rm(rest, session),
        "summary" | "s" => cli_summary(rest, session),
        "export" => cli_export(rest, session),
        "import" => cli_import(rest, session),
        "wipe" => cli_wipe(rest, session),
        "config" => cli_config(rest, session),
        "sync" => cli_sync(rest, session),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("budgetsync {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("budgetsync: monthly budgets and expenses, synced across devices");
    println!();
    println!("Usage: budgetsync [command]");
    println!();
    println!("Commands:");
    println!("  summary [YYYY-MM]             Spending against each budget (default)");
    println!("  budgets [YYYY-MM]             List budgets, seeding an empty month from the last");
    println!("  budget-set <name> <value>     Create or update a budget");
    println!("    --month <YYYY-MM>           Month for a new budget (default: current)");
    println!("    --id <id>                   Update this budget instead of creating one");
    println!("  budget-rm <id>                Delete a budget");
    println!("  copy <from> <to>              Copy a month's budgets into another month");
    println!("  expenses [YYYY-MM]            List expenses, newest first");
    println!("    --from <date> --to <date>   List an inclusive date range instead");
    println!("  spend <description> <cost>    Record an expense");
    println!("    --date <YYYY-MM-DD>         Date of the expense (default: today)");
    println!("    --budget <name>             Budget to file it under");
    println!("    --id <id>                   Update this expense instead of creating one");
    println!("  expense-rm <id>               Delete an expense");
    println!("  export <file.json>            Write every budget and expense to a file");
    println!("  import <file.json>            Load an export file");
    println!("    --replace                   Delete existing data first");
    println!("  wipe --yes                    Delete all data, locally and remotely");
    println!("  config [name [value]]         Show or change settings");
    println!("  sync [--seconds <n>]          Stay connected and report sync activity");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
}

// ── Argument helpers ──────────────────────────────────────────

/// Value following `--name`, if present.
fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn has_switch(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

/// Arguments that are neither flags nor flag values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut found = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if SWITCHES.contains(&arg.as_str()) {
            continue;
        }
        if arg.starts_with("--") {
            iter.next();
            continue;
        }
        found.push(arg.as_str());
    }
    found
}

fn month_arg(args: &[String]) -> Result<String> {
    match positionals(args).first() {
        None => Ok(current_month()),
        Some(month) if is_valid_month(month) => Ok(month.to_string()),
        Some(month) => bail!("Invalid month: {month} (expected YYYY-MM)"),
    }
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

fn currency(session: &Session) -> String {
    session.settings().get(CURRENCY)
}

// ── Budgets ───────────────────────────────────────────────────

/// Seed an empty month from the one before it, but only for the current
/// month or later. Returns how many budgets were copied.
fn seed_month(db: &Database, month: &str, current: &str) -> Result<usize> {
    if month < current || !budgets_for_month(db, month)?.is_empty() {
        return Ok(0);
    }
    let Some(previous) = shift_month(month, -1) else {
        return Ok(0);
    };
    Ok(copy_budgets(db, &previous, month)?.len())
}

fn cli_budgets(args: &[String], session: &mut Session) -> Result<()> {
    let month = month_arg(args)?;
    let db = session.db()?;
    let seeded = seed_month(db, &month, &current_month())?;
    if seeded > 0 {
        println!("Seeded {seeded} budgets from the previous month");
    }

    let budgets = budgets_for_month(db, &month)?;
    if budgets.is_empty() {
        println!("No budgets for {month}");
        return Ok(());
    }
    let currency = currency(session);
    println!("{:<24} {:>14}  ID", "Budget", "Value");
    println!("{}", "─".repeat(64));
    for budget in &budgets {
        println!(
            "{:<24} {:>14}  {}",
            truncate(&budget.name, 24),
            format_amount(budget.value, &currency),
            budget.id
        );
    }
    Ok(())
}

fn cli_budget_set(args: &[String], session: &mut Session) -> Result<()> {
    let pos = positionals(args);
    let (Some(name), Some(value)) = (pos.first(), pos.get(1)) else {
        bail!("Usage: budgetsync budget-set <name> <value> [--month YYYY-MM] [--id ID]");
    };
    let value = parse_amount(value).ok_or(FinanceError::InvalidValue)?;
    let budget = Budget {
        id: flag(args, "--id").unwrap_or(NEW_ID).to_string(),
        name: name.to_string(),
        month: flag(args, "--month").map_or_else(current_month, str::to_string),
        value,
    };

    let saved = save_budget(session.db()?, &budget)?;
    println!(
        "Saved budget {} for {}: {} ({})",
        saved.name,
        saved.month,
        format_amount(saved.value, &currency(session)),
        saved.id
    );
    Ok(())
}

fn cli_budget_rm(args: &[String], session: &mut Session) -> Result<()> {
    let Some(id) = positionals(args).first().copied() else {
        bail!("Usage: budgetsync budget-rm <id>");
    };
    delete_budget(session.db()?, id)?;
    println!("Deleted budget {id}");
    Ok(())
}

fn cli_copy(args: &[String], session: &mut Session) -> Result<()> {
    let pos = positionals(args);
    let (Some(from), Some(to)) = (pos.first(), pos.get(1)) else {
        bail!("Usage: budgetsync copy <from YYYY-MM> <to YYYY-MM>");
    };
    let db = session.db()?;
    if !budgets_for_month(db, to)?.is_empty() {
        bail!("{to} already has budgets; nothing copied");
    }
    let copied = copy_budgets(db, from, to)?;
    println!("Copied {} budgets from {from} to {to}", copied.len());
    Ok(())
}

// ── Expenses ──────────────────────────────────────────────────

fn cli_expenses(args: &[String], session: &mut Session) -> Result<()> {
    let (expenses, period) = match (flag(args, "--from"), flag(args, "--to")) {
        (Some(from), Some(to)) => (
            expenses_between(session.db()?, from, to)?,
            format!("{from} to {to}"),
        ),
        (None, None) => {
            let month = month_arg(args)?;
            (expenses_for_month(session.db()?, &month)?, month)
        }
        _ => bail!("Use --from and --to together"),
    };
    if expenses.is_empty() {
        println!("No expenses for {period}");
        return Ok(());
    }
    let currency = currency(session);
    println!("{:<10}  {:<28} {:<16} {:>12}  ID", "Date", "Description", "Budget", "Cost");
    println!("{}", "─".repeat(96));
    for expense in &expenses {
        println!(
            "{:<10}  {:<28} {:<16} {:>12}  {}",
            expense.date,
            truncate(&expense.description, 28),
            truncate(&expense.budget, 16),
            format_amount(expense.cost, &currency),
            expense.id
        );
    }
    Ok(())
}

fn cli_spend(args: &[String], session: &mut Session) -> Result<()> {
    let pos = positionals(args);
    let (Some(description), Some(cost)) = (pos.first(), pos.get(1)) else {
        bail!("Usage: budgetsync spend <description> <cost> [--date YYYY-MM-DD] [--budget NAME] [--id ID]");
    };
    let cost = parse_amount(cost).ok_or(FinanceError::InvalidCost)?;
    let expense = Expense {
        id: flag(args, "--id").unwrap_or(NEW_ID).to_string(),
        description: description.to_string(),
        cost,
        date: flag(args, "--date").unwrap_or_default().to_string(),
        budget: flag(args, "--budget").unwrap_or_default().to_string(),
    };

    let saved = save_expense(session.db()?, &expense)?;
    println!(
        "Saved {} on {} under {}: {} ({})",
        saved.description,
        saved.date,
        saved.budget,
        format_amount(saved.cost, &currency(session)),
        saved.id
    );
    Ok(())
}

fn cli_expense_rm(args: &[String], session: &mut Session) -> Result<()> {
    let Some(id) = positionals(args).first().copied() else {
        bail!("Usage: budgetsync expense-rm <id>");
    };
    delete_expense(session.db()?, id)?;
    println!("Deleted expense {id}");
    Ok(())
}

fn cli_summary(args: &[String], session: &mut Session) -> Result<()> {
    let month = month_arg(args)?;
    let summary = month_summary(session.db()?, &month)?;
    let currency = currency(session);

    println!("budgetsync: {}", summary.month);
    println!("{}", "─".repeat(66));
    println!("{:<24} {:>13} {:>13} {:>13}", "Budget", "Allocated", "Spent", "Remaining");
    for row in summary.rows.iter().chain(std::iter::once(&summary.total)) {
        println!(
            "{:<24} {:>13} {:>13} {:>13}",
            truncate(&row.name, 24),
            format_amount(row.allocated, &currency),
            format_amount(row.spent, &currency),
            format_amount(row.remaining(), &currency),
        );
    }
    Ok(())
}

// ── Bulk transfer ─────────────────────────────────────────────

fn cli_export(args: &[String], session: &mut Session) -> Result<()> {
    let Some(path) = positionals(args).first().map(|p| shellexpand(p)) else {
        bail!("Usage: budgetsync export <file.json>");
    };
    let payload = transfer::export(session.db()?)?;
    transfer::write_export(Path::new(&path), &payload)?;
    println!(
        "Exported {} budgets and {} expenses to {path}",
        payload.budgets.len(),
        payload.expenses.len()
    );
    Ok(())
}

fn cli_import(args: &[String], session: &mut Session) -> Result<()> {
    let Some(path) = positionals(args).first().map(|p| shellexpand(p)) else {
        bail!("Usage: budgetsync import <file.json> [--replace]");
    };
    let path = Path::new(&path);
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    let payload = transfer::read_export(path)?;
    let (budgets, expenses) =
        transfer::import(session.db()?, &payload, has_switch(args, "--replace"))?;
    println!("Imported {budgets} budgets and {expenses} expenses");
    Ok(())
}

fn cli_wipe(args: &[String], session: &mut Session) -> Result<()> {
    if !has_switch(args, "--yes") {
        bail!("This deletes every budget and expense, including the synced copy. Re-run with --yes");
    }
    transfer::delete_everything(session)?;
    println!("All data deleted");
    Ok(())
}

// ── Settings and sync ─────────────────────────────────────────

fn cli_config(args: &[String], session: &mut Session) -> Result<()> {
    let store = session.settings();
    match args {
        [] => {
            for name in settings::known() {
                println!("{name:<14} {}", store.get(name));
            }
        }
        [name, rest @ ..] => {
            if !settings::known().contains(&name.as_str()) {
                bail!(
                    "Unknown setting: {name} (known: {})",
                    settings::known().join(", ")
                );
            }
            match rest.first() {
                None => println!("{}", store.get(name)),
                Some(value) => {
                    store.set(name, value)?;
                    println!("{name} = {value}");
                }
            }
        }
    }
    Ok(())
}

fn cli_sync(args: &[String], session: &mut Session) -> Result<()> {
    session.db()?;
    if !session.is_syncing() {
        bail!("Sync is not configured. Set a remote with: budgetsync config syncToken <url>");
    }
    let limit = match flag(args, "--seconds") {
        Some(text) => match text.parse::<u64>() {
            Ok(seconds) => Some(Duration::from_secs(seconds)),
            Err(_) => bail!("Invalid --seconds value: {text}"),
        },
        None => None,
    };

    let started = Instant::now();
    println!("Syncing with {}", session.settings().get(settings::SYNC_TOKEN));
    while limit.map_or(true, |limit| started.elapsed() < limit) {
        for event in session.drain_events() {
            match event {
                SessionEvent::Liveness { collection, alive } => {
                    let status = if alive { "connected" } else { "offline, retrying" };
                    println!("{collection}: {status}");
                }
                SessionEvent::Changed(change) => println!(
                    "{}: pulled {}, pushed {}",
                    change.collection, change.pulled, change.pushed
                ),
            }
        }
        std::thread::sleep(Duration::from_millis(250));
    }
    let status = if session.is_online() { "online" } else { "offline" };
    match session.settings().get(settings::LAST_SYNC_DATE) {
        last if last.is_empty() => println!("Sync {status}, never completed"),
        last => println!("Sync {status}, last synced {last}"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
