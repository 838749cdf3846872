//! Prompter configuration
//!
//! Loaded from TOML. Every key is optional; a missing file means defaults.

use crate::error::{BridgeError, BridgeResult};
use crate::window::{Display, Rect};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "PROMPTER_CONFIG";

/// Upper bound for the stage idle wait, keeps updates visually responsive
pub const MAX_SYNC_INTERVAL_MS: u64 = 150;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrompterConfig {
    /// Longest time the stage waits for dashboard frames while idle
    pub sync_interval_ms: u64,
    /// Target animation frame interval while playing
    pub frame_interval_ms: u64,
    /// Largest script file accepted by the loader
    pub max_file_bytes: u64,
    /// Extra scroll room below the last line
    pub scroll_margin_px: f64,
    /// Speed change per arrow key press on the stage
    pub speed_step: f64,
    pub log_level: String,
    pub stage: StageWindowConfig,
    /// Displays reported by the headless host
    pub displays: Vec<Display>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageWindowConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for StageWindowConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

impl Default for PrompterConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 100,
            frame_interval_ms: 16,
            max_file_bytes: 10 * 1024 * 1024,
            scroll_margin_px: 200.0,
            speed_step: 10.0,
            log_level: "info".to_string(),
            stage: StageWindowConfig::default(),
            displays: vec![Display {
                id: 1,
                bounds: Rect::new(0.0, 0.0, 1920.0, 1080.0),
                work_area: Rect::new(0.0, 25.0, 1920.0, 1055.0),
                is_primary: true,
            }],
        }
    }
}

impl PrompterConfig {
    /// Default config location: `<config_dir>/stage-prompter/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("stage-prompter");
        path.push("config.toml");
        Some(path)
    }

    /// Resolve the config path: explicit argument, then env var, then default
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(Self::default_path)
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load(path: Option<&Path>) -> BridgeResult<Self> {
        let path = match Self::resolve_path(path) {
            Some(path) => path,
            None => {
                log::warn!("Cannot determine config directory, using defaults");
                return Ok(Self::default());
            }
        };

        match fs::read_to_string(&path) {
            Ok(content) => {
                let config = Self::from_toml(&content)
                    .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
                log::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(BridgeError::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Parse and validate TOML content
    pub fn from_toml(content: &str) -> BridgeResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| BridgeError::Config(e.to_string()))?;
        Ok(config.validated())
    }

    fn validated(mut self) -> Self {
        if self.sync_interval_ms == 0 || self.sync_interval_ms > MAX_SYNC_INTERVAL_MS {
            let clamped = self.sync_interval_ms.clamp(1, MAX_SYNC_INTERVAL_MS);
            log::warn!(
                "sync_interval_ms {} out of range, using {}",
                self.sync_interval_ms,
                clamped
            );
            self.sync_interval_ms = clamped;
        }
        self.frame_interval_ms = self.frame_interval_ms.max(1);
        if self.scroll_margin_px < 0.0 {
            self.scroll_margin_px = 0.0;
        }
        if self.displays.is_empty() {
            self.displays = Self::default().displays;
        }
        self
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PrompterConfig::default();
        assert_eq!(config.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.sync_interval(), Duration::from_millis(100));
        assert_eq!(config.displays.len(), 1);
        assert!(config.displays[0].is_primary);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PrompterConfig::from_toml(
            r#"
            max_file_bytes = 2048
            [stage]
            width = 800.0
            "#,
        )
        .unwrap();
        assert_eq!(config.max_file_bytes, 2048);
        assert_eq!(config.stage.width, 800.0);
        assert_eq!(config.stage.height, 800.0);
        assert_eq!(config.frame_interval_ms, 16);
    }

    #[test]
    fn test_sync_interval_is_clamped() {
        let config = PrompterConfig::from_toml("sync_interval_ms = 5000").unwrap();
        assert_eq!(config.sync_interval_ms, MAX_SYNC_INTERVAL_MS);

        let config = PrompterConfig::from_toml("sync_interval_ms = 0").unwrap();
        assert_eq!(config.sync_interval_ms, 1);
    }

    #[test]
    fn test_displays_from_toml() {
        let config = PrompterConfig::from_toml(
            r#"
            [[displays]]
            id = 1
            is_primary = true
            bounds = { x = 0.0, y = 0.0, width = 1920.0, height = 1080.0 }
            work_area = { x = 0.0, y = 0.0, width = 1920.0, height = 1040.0 }

            [[displays]]
            id = 2
            is_primary = false
            bounds = { x = 1920.0, y = 0.0, width = 1280.0, height = 720.0 }
            work_area = { x = 1920.0, y = 0.0, width = 1280.0, height = 720.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.displays.len(), 2);
        assert_eq!(config.displays[1].bounds.x, 1920.0);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = PrompterConfig::from_toml("max_file_bytes = \"lots\"").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PrompterConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, PrompterConfig::default());
    }
}
