use std::path::{Path, PathBuf};

use tracing::warn;

use super::ChatSettings;
use crate::repositories::StorageResult;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub struct SettingsJsonRepository {
    file_path: PathBuf,
}

impl SettingsJsonRepository {
    /// Settings file inside an explicit data directory
    pub fn in_dir(dir: &Path) -> Self {
        Self::with_path(dir.join(SETTINGS_FILE_NAME))
    }

    /// Create repository with custom path (for testing)
    pub fn with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn storage_path(&self) -> &Path {
        &self.file_path
    }

    /// Load settings, falling back to defaults when the file is missing or unreadable
    pub fn load(&self) -> ChatSettings {
        let contents = match std::fs::read_to_string(&self.file_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ChatSettings::default(),
            Err(e) => {
                warn!(path = %self.file_path.display(), error = ?e, "Failed to read settings, using defaults");
                return ChatSettings::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.file_path.display(), error = ?e, "Invalid settings file, using defaults");
            ChatSettings::default()
        })
    }

    pub fn save(&self, settings: &ChatSettings) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write atomically using temp file + rename
        let temp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.file_path)?;

        Ok(())
    }
}
