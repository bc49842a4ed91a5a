use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::settings::{save_settings_to, settings_path, Settings};

/// Create the data and export directories. Settings are written when none
/// exist yet or when a data directory was given explicitly.
pub fn run(settings: Settings, persist: bool) -> Result<String> {
    init_with(&settings, &settings_path(), persist)
}

fn init_with(settings: &Settings, config: &Path, persist: bool) -> Result<String> {
    let data_dir = settings.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    std::fs::create_dir_all(settings.export_dir())?;

    if persist || !config.exists() {
        save_settings_to(settings, config)?;
        info!("Saved settings to {}", config.display());
    }

    Ok(format!(
        "Initialized rekap at {}\nPut target-YYYY-MM.json and transactions-YYYY-MM.json (or .csv) there.",
        data_dir.display()
    ))
}
