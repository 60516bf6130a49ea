pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod logging;
pub mod storage;
pub mod theme;
pub mod view;
pub use context::BrowsingContext;
pub use error::{AppError, AppResult};
pub use theme::{ThemePreference, ThemeSubscription, ThemeSync, THEME_KEY};
pub use view::{mount_page, PageMount, ThemeHandle};

use storage::{JsonFileStore, SharedStorage};

/// Entrypoint used by the CLI binary.
pub fn run() -> AppResult<()> {
    logging::init();
    let command = cli::Command::parse(std::env::args().skip(1))?;

    let dirs = config::ConfigDirs::from_env();
    let config = config::AppConfig::load(&dirs);
    let path = config.store_path(&dirs)?;
    tracing::info!(path = %path.display(), "starting skolarin-theme");

    let storage = SharedStorage::new(JsonFileStore::new(path));

    let report = cli::execute(&command, &storage, config.theme_key())?;
    println!("{}", report.render(command.json)?);
    Ok(())
}
