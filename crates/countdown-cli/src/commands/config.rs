use std::path::PathBuf;

use clap::Subcommand;
use countdown_core::storage::SettingKey;
use countdown_core::ConfigError;

use super::open_settings;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a setting value
    Get {
        /// Setting key (e.g. "voice_interval", "melody_file")
        key: String,
    },
    /// Set a setting value
    Set {
        /// Setting key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings as JSON
    List,
    /// Reset settings to defaults
    Reset,
    /// Print the settings file location
    Path,
}

pub fn run(action: ConfigAction, settings: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_settings(settings)?;
    match action {
        ConfigAction::Get { key } => {
            println!("{}", store.get(&key).map_err(with_known_keys)?);
        }
        ConfigAction::Set { key, value } => {
            store.put(&key, &value).map_err(with_known_keys)?;
            println!("ok");
        }
        ConfigAction::List => {
            let json = serde_json::to_string_pretty(store.settings())?;
            println!("{json}");
            for warning in store.warnings() {
                eprintln!("warning: {warning}");
            }
        }
        ConfigAction::Reset => {
            store.reset()?;
            println!("settings reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", store.path().display());
        }
    }
    Ok(())
}

fn with_known_keys(err: ConfigError) -> Box<dyn std::error::Error> {
    match err {
        ConfigError::UnknownKey(_) => {
            let keys: Vec<&str> = SettingKey::ALL.into_iter().map(SettingKey::name).collect();
            format!("{err} (known keys: {})", keys.join(", ")).into()
        }
        other => other.into(),
    }
}
