//! Guide files on disk. The format follows the extension: `.json` or `.toml`.

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{GuideError, StudyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideFormat {
    Json,
    Toml,
}

impl GuideFormat {
    pub fn from_path(path: &Path) -> Result<Self, GuideError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(GuideError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl StudyConfig {
    /// Load a guide file. The result is not validated.
    pub fn load(path: &Path) -> Result<Self, GuideError> {
        let format = GuideFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), ?format, "Loading guide");

        match format {
            GuideFormat::Json => {
                serde_json::from_str(&content).map_err(|e| GuideError::Parse(e.to_string()))
            }
            GuideFormat::Toml => toml::from_str(&content).map_err(|e| GuideError::Parse(e.to_string())),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), GuideError> {
        let content = match GuideFormat::from_path(path)? {
            GuideFormat::Json => {
                serde_json::to_string_pretty(self).map_err(|e| GuideError::Parse(e.to_string()))?
            }
            GuideFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| GuideError::Parse(e.to_string()))?
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }
}
