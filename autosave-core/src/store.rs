//! JSON persistence for [`Settings`].
//!
//! The dialog process writes the file; the running client only ever reads
//! it, picking up edits by watching the modification time.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{fmt, fs};

use crate::settings::Settings;

// ── StoreError ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)        => write!(f, "settings file I/O failed: {e}"),
            Self::Serialize(e) => write!(f, "settings serialization failed: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e)
    }
}

// ── Load / save ──────────────────────────────────────────────────────────────

/// `<config dir>/fsx-autosave/settings.json`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fsx-autosave").join("settings.json"))
}

/// Load settings, clamping numeric fields. A missing or corrupt file yields
/// the defaults — starting with a broken config must never be fatal.
pub fn load(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<Settings>(&text) {
            Ok(settings) => settings.clamped(),
            Err(e) => {
                log::warn!(
                    "settings file {} is corrupt ({e}); using defaults",
                    path.display()
                );
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

pub fn save(path: &Path, settings: &Settings) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    log::info!("settings saved: {settings:?}");
    Ok(())
}

/// Modification time of the settings file, if it exists.
pub fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
