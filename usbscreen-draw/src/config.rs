//! Draw client configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use usbscreen_core::DeviceConfig;

/// Top-level configuration for the draw client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// Which display to open.
    pub device: DeviceConfig,
    /// Panel settings applied before drawing.
    pub display: DisplayConfig,
    /// Mixer effects.
    pub mixer: MixerConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Panel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Backlight level.
    pub light: u8,
    /// Landscape orientation.
    pub landscape: bool,
    /// Upside down.
    pub invert: bool,
    /// Mirror horizontally.
    pub mirror: bool,
}

/// Mixer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Effect names; one is picked at random per image. Empty draws the
    /// whole image at once.
    pub effects: Vec<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            light: 100,
            landscape: false,
            invert: false,
            mirror: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl DrawConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Drawable size once the configured orientation is applied.
    pub fn canvas_size(&self) -> (u32, u32) {
        let (w, h) = (self.device.width, self.device.height);
        if self.display.landscape { (h, w) } else { (w, h) }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&DrawConfig::default()).unwrap();
        assert!(text.contains("light = 100"));
        assert!(text.contains("effects"));
    }

    #[test]
    fn parses_effects_and_orientation() {
        let cfg: DrawConfig = toml::from_str(
            r#"
            [device]
            target = "10.0.0.2:9123"

            [display]
            landscape = true

            [mixer]
            effects = ["block"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.mixer.effects, vec!["block".to_string()]);
        assert_eq!(cfg.display.light, 100);
        assert_eq!(cfg.canvas_size(), (480, 320));
    }

    #[test]
    fn portrait_canvas() {
        assert_eq!(DrawConfig::default().canvas_size(), (320, 480));
    }
}
