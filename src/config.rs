//! Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Studio configuration, persisted as JSON in the platform config dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Initial window size.
    pub window_width: u32,
    pub window_height: u32,
    /// Capture device index.
    pub camera_index: u32,
    /// Requested capture resolution.
    pub camera_width: u32,
    pub camera_height: u32,
    /// Asset root override. `None` falls back to env/`./assets`.
    pub asset_root: Option<PathBuf>,
    /// Model library entry selected at startup.
    pub active_model: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 800,
            camera_index: 0,
            camera_width: 1280,
            camera_height: 720,
            asset_root: None,
            active_model: "teapot".to_string(),
        }
    }
}

impl StudioConfig {
    /// Config file location inside the platform config dir.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("arcolor-studio").join("config.json"))
    }

    /// Load the config, falling back to defaults. A missing file is normal;
    /// a malformed one is logged and replaced by defaults.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => {
                    log::info!("loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Write the config, creating the directory if needed.
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, text)?;
        log::info!("saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.window_width, 1280);
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.active_model, "teapot");
        assert!(config.asset_root.is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: StudioConfig =
            serde_json::from_str(r#"{"camera_index": 2, "active_model": "fox"}"#)
                .expect("partial config parses");
        assert_eq!(config.camera_index, 2);
        assert_eq!(config.active_model, "fox");
        assert_eq!(config.window_width, 1280, "missing fields use defaults");
    }

    #[test]
    fn test_roundtrip() {
        let mut config = StudioConfig::default();
        config.camera_width = 640;
        config.asset_root = Some(PathBuf::from("/srv/assets"));
        let text = serde_json::to_string(&config).expect("serializes");
        let back: StudioConfig = serde_json::from_str(&text).expect("parses");
        assert_eq!(back.camera_width, 640);
        assert_eq!(back.asset_root, Some(PathBuf::from("/srv/assets")));
    }
}
