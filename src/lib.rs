pub mod capture;
pub mod cli;
pub mod dates;
pub mod db;
pub mod errors;
pub mod notion;
pub mod payload;
pub mod schema;
pub mod settings;
pub mod shell;
pub mod utils;

use anyhow::Context;
use clap::Parser;

use cli::{AppState, Cli};
use db::Database;
use settings::SettingsStore;

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    utils::logging::init(cli.verbose || settings::debug_enabled());
    log::info!("capturebar starting up...");

    let data_dir = settings::data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let state = AppState {
        db: Database::new(data_dir.join("capturebar.sqlite3"))?,
        settings: SettingsStore::new(data_dir.join("settings.json"))?,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(cli::dispatch(cli.command, &state));
    if let Err(err) = &result {
        log::error!("{err:#}");
    }
    result
}
