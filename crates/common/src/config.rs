//! Backdrop configuration, loadable from YAML or JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_DPR_CAP, LayerOrder, PaletteSet, Theme};

/// Errors from loading or validating a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Initial window size in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Renderer configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackdropConfig {
    /// Upper bound on drawn frames per second.
    pub max_fps: f64,
    /// Upper bound on the device pixel ratio.
    pub dpr_cap: f64,
    pub layer_order: LayerOrder,
    /// Expanding rings anchored off the bottom-right corner.
    pub ring_overlay: bool,
    pub initial_theme: Theme,
    pub palettes: PaletteSet,
    pub window: WindowConfig,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            max_fps: 60.0,
            dpr_cap: DEFAULT_DPR_CAP,
            layer_order: LayerOrder::default(),
            ring_overlay: true,
            initial_theme: Theme::default(),
            palettes: PaletteSet::default(),
            window: WindowConfig::default(),
        }
    }
}

impl BackdropConfig {
    /// Load a config file; the format is chosen by extension (`yaml`, `yml`, `json`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        tracing::debug!(path = %path.display(), "loaded backdrop config");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_fps.is_finite() && self.max_fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_fps must be positive, got {}",
                self.max_fps
            )));
        }
        if !(self.dpr_cap.is_finite() && self.dpr_cap >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "dpr_cap must be at least 1.0, got {}",
                self.dpr_cap
            )));
        }
        if !self.palettes.light.is_in_range() || !self.palettes.dark.is_in_range() {
            return Err(ConfigError::Invalid(
                "palette colors must lie in [0, 1]".into(),
            ));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("window size must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Palette;

    #[test]
    fn defaults_are_valid() {
        let config = BackdropConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_fps, 60.0);
        assert_eq!(config.dpr_cap, 2.0);
        assert!(config.ring_overlay);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = BackdropConfig::from_yaml_str(
            "max_fps: 30\nlayer_order: shapes_behind\ninitial_theme: dark\n",
        )
        .unwrap();
        assert_eq!(config.max_fps, 30.0);
        assert_eq!(config.layer_order, LayerOrder::ShapesBehind);
        assert_eq!(config.initial_theme, Theme::Dark);
        assert_eq!(config.palettes.light, Palette::LIGHT);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn json_palette_override() {
        let config = BackdropConfig::from_json_str(
            r#"{"palettes": {
                "light": {"color1": [1,0,0], "color2": [0,1,0],
                          "color3": [0,0,1], "color4": [1,1,1]},
                "dark":  {"color1": [0,0,0], "color2": [0,0,0],
                          "color3": [0,0,0], "color4": [0,0,0]}
            }}"#,
        )
        .unwrap();
        assert_eq!(config.palettes.light.color1, glam::Vec3::X);
        assert_eq!(config.palettes.dark.color4, glam::Vec3::ZERO);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            BackdropConfig::from_yaml_str("max_fps: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BackdropConfig::from_yaml_str("dpr_cap: 0.5"),
            Err(ConfigError::Invalid(_))
        ));
        let mut config = BackdropConfig::default();
        config.palettes.dark.color2 = glam::Vec3::new(2.0, 0.0, 0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = std::env::temp_dir().join("backdrop-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("backdrop.toml");
        std::fs::write(&path, "max_fps = 60").unwrap();
        assert!(matches!(
            BackdropConfig::load(&path),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "toml"
        ));
    }
}
