// SPDX-License-Identifier: MIT OR Apache-2.0
//! Container settings, stored as RON.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings applied when a [`NodeContainer`](crate::NodeContainer) is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Keep one root node per object identity for the lifetime of the container.
    /// When disabled, identities are only shared within a single build.
    pub track_identity: bool,
    /// Named types treated as leaves
    pub primitive_types: Vec<String>,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            track_identity: true,
            primitive_types: Vec::new(),
        }
    }
}

impl ContainerSettings {
    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, SettingsError> {
        Ok(ron::from_str(s)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_ron(&content)?;
        tracing::debug!(path = %path.display(), "loaded container settings");
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

/// Error reading or writing settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON text could not be parsed
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = ContainerSettings::default();
        assert!(settings.track_identity);
        assert!(settings.primitive_types.is_empty());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = ContainerSettings {
            track_identity: false,
            primitive_types: vec!["Guid".to_string()],
        };
        let ron_str = settings.to_ron().unwrap();
        let loaded = ContainerSettings::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let loaded = ContainerSettings::from_ron("(primitive_types: [\"Color\"])").unwrap();
        assert!(loaded.track_identity);
        assert_eq!(loaded.primitive_types, vec!["Color".to_string()]);
        assert!(matches!(
            ContainerSettings::from_ron("(track_identity: 3)"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_settings_file_round_trip() {
        let path = std::env::temp_dir().join(format!("object_graph_{}.ron", uuid::Uuid::new_v4()));
        let settings = ContainerSettings {
            track_identity: true,
            primitive_types: vec!["Vector3".to_string()],
        };
        settings.save(&path).unwrap();
        let loaded = ContainerSettings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }
}
