mod db;
mod engine;
mod error;
mod models;
mod run;
mod session;
mod settings;
mod sync;
mod transfer;
mod validate;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    let settings = Arc::new(settings::FileSettings::load(&get_settings_path()?)?);
    let mut session = session::Session::connect(&get_db_path()?, settings);
    run::as_cli(&args, &mut session)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("budgetsync=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "budgetsync", "BudgetSync")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
}

fn get_db_path() -> Result<std::path::PathBuf> {
    let proj_dirs = project_dirs()?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("budgetsync.db"))
}

fn get_settings_path() -> Result<std::path::PathBuf> {
    Ok(project_dirs()?.config_dir().join("settings.json"))
}
