mod cli;
mod format;

pub(crate) use cli::as_cli;

#[cfg(test)]
#[path = "run/format_tests.rs"]
mod format_tests;
