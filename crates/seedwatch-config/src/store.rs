//! Where settings live between runs.
//!
//! # Design
//! - Loading a store that has never been written yields defaults; the file is
//!   only created by the first save.
//! - Saves go through a sibling temporary file and a rename so a crash never
//!   leaves a truncated settings file behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Settings;

const APP_DIR: &str = "seedwatch";
const FILE_NAME: &str = "settings.json";

/// Persistence for [`Settings`].
pub trait ConfigStore: Send + Sync {
    /// Read the stored settings, or defaults when nothing has been stored.
    ///
    /// # Errors
    ///
    /// Returns an error when stored settings exist but cannot be read or are invalid.
    fn load(&self) -> ConfigResult<Settings>;

    /// Replace the stored settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings are invalid or cannot be written.
    fn save(&self, settings: &Settings) -> ConfigResult<()>;
}

/// JSON file store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store backed by an explicit file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/seedwatch/settings.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when the platform has no config directory.
    pub fn default_location() -> ConfigResult<Self> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push(APP_DIR);
        path.push(FILE_NAME);
        Ok(Self::new(path))
    }

    /// File the settings are stored in.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> ConfigResult<Settings> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file; using defaults");
                return Ok(Settings::default());
            }
            Err(err) => return Err(ConfigError::io("read settings", &self.path, err)),
        };
        let settings: Settings = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> ConfigResult<()> {
        settings.validate()?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| ConfigError::io("create settings directory", parent, err))?;
        }
        let mut rendered = serde_json::to_string_pretty(settings)
            .map_err(|source| ConfigError::Serialize { source })?;
        rendered.push('\n');

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, rendered)
            .map_err(|err| ConfigError::io("write settings", &staging, err))?;
        fs::rename(&staging, &self.path)
            .map_err(|err| ConfigError::io("replace settings", &self.path, err))?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Store that keeps settings in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    settings: Mutex<Option<Settings>>,
}

impl MemoryConfigStore {
    /// Store pre-populated with `settings`.
    #[must_use]
    pub const fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
        }
    }

    /// Last saved settings, if any were ever stored.
    #[must_use]
    pub fn stored(&self) -> Option<Settings> {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> ConfigResult<Settings> {
        Ok(self.stored().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> ConfigResult<()> {
        settings.validate()?;
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedwatch_core::SortKey;

    #[test]
    fn memory_store_round_trips_and_validates() -> anyhow::Result<()> {
        let store = MemoryConfigStore::default();
        assert_eq!(store.load()?, Settings::default());
        assert!(store.stored().is_none());

        let settings = Settings {
            sort_order: SortKey::Status,
            ..Settings::default()
        };
        store.save(&settings)?;
        assert_eq!(store.load()?.sort_order, SortKey::Status);

        let invalid = Settings {
            poll_interval_secs: 0,
            ..Settings::default()
        };
        assert!(store.save(&invalid).is_err());
        assert_eq!(store.stored(), Some(settings));
        Ok(())
    }

    #[test]
    fn default_location_ends_with_app_file() {
        if let Ok(store) = FileConfigStore::default_location() {
            assert!(store.path().ends_with("seedwatch/settings.json"));
        }
    }
}
