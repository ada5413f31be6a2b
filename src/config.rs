use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ChatError;

/// The credential/config triple for the completion endpoint. Reloaded from
/// disk before every send so settings edits take effect without a restart.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: String,
    #[serde(default)]
    pub model: String,
}

/// On-disk layout: a single `[settings]` table.
#[derive(Serialize, Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    settings: Settings,
}

impl Settings {
    pub fn new(api_key: &str, api_base: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.to_string(),
            model: model.to_string(),
        }
    }

    /// A send is attempted only if all three fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.api_base.is_empty() && !self.model.is_empty()
    }

    pub fn load() -> Result<Self, ChatError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<(), ChatError> {
        self.save_to(&Self::config_path()?)
    }

    /// Missing file means "unconfigured": three empty strings, never an
    /// error. An unreadable or unparsable file is surfaced explicitly.
    pub fn load_from(path: &Path) -> Result<Self, ChatError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ChatError::Persistence(e.to_string()))?;
        let file: SettingsFile =
            toml::from_str(&content).map_err(|e| ChatError::Persistence(e.to_string()))?;
        Ok(file.settings)
    }

    /// Whole-file rewrite; there is no partial update.
    pub fn save_to(&self, path: &Path) -> Result<(), ChatError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ChatError::Persistence(e.to_string()))?;
        }

        let file = SettingsFile {
            settings: self.clone(),
        };
        let content =
            toml::to_string_pretty(&file).map_err(|e| ChatError::Persistence(e.to_string()))?;
        fs::write(path, content).map_err(|e| ChatError::Persistence(e.to_string()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf, ChatError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ChatError::Persistence("could not determine config directory".into()))?;
        Ok(config_dir.join("charla").join("settings.toml"))
    }
}
