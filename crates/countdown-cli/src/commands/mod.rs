pub mod config;
pub mod phrase;
pub mod start;

use std::path::PathBuf;

use countdown_core::SettingsStore;

/// Open the settings file given on the command line, or the default one.
pub fn open_settings(path: Option<PathBuf>) -> Result<SettingsStore, Box<dyn std::error::Error>> {
    let path = match path {
        Some(path) => path,
        None => SettingsStore::default_path()?,
    };
    Ok(SettingsStore::load(path))
}
