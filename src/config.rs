//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML value and the user's file is deep-merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `config.toml` is read from the config directory (`--config-dir`, default
//! the current directory). A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [ratios]
//! photo = "4:5"             # Ratio a photo post locks to on first selection
//! reel = "16:9"             # Ratio a reel-style post locks to
//!
//! [output]
//! quality = 90              # JPEG quality (1-100)
//! dir = "finalized"         # Where finalized bitmaps are written
//!
//! [viewport]
//! width = 390.0             # Space available for the crop frame
//! height = 390.0
//! ```
//!
//! Ratios must be one of `1:1`, `4:5`, `16:9`. The output pixel size of each
//! ratio is fixed and not configurable.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{FrameSize, OutputConfig, Quality};
use crate::ratio::{AspectRatio, PostKind};
use crate::session::SessionSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default ratio lock per post kind.
    pub ratios: RatiosConfig,
    /// Finalized bitmap settings.
    pub output: OutputSettings,
    /// Viewport the crop frame is fitted into.
    pub viewport: ViewportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatiosConfig {
    pub photo: AspectRatio,
    pub reel: AspectRatio,
}

impl Default for RatiosConfig {
    fn default() -> Self {
        Self {
            photo: PostKind::Photo.default_ratio(),
            reel: PostKind::Reel.default_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// JPEG quality (1-100).
    pub quality: u32,
    /// Output directory, relative to the config directory unless absolute.
    pub dir: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            quality: 90,
            dir: "finalized".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 390.0,
            height: 390.0,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.output.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.dir must not be empty".into(),
            ));
        }
        let ViewportConfig { width, height } = self.viewport;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::Validation(
                "viewport width and height must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn ratio_for(&self, kind: PostKind) -> AspectRatio {
        match kind {
            PostKind::Photo => self.ratios.photo,
            PostKind::Reel => self.ratios.reel,
        }
    }

    pub fn viewport(&self) -> FrameSize {
        FrameSize::new(self.viewport.width, self.viewport.height)
    }

    /// Output settings with `dir` resolved against `base`.
    pub fn output_config(&self, base: &Path) -> OutputConfig {
        OutputConfig {
            dir: base.join(&self.output.dir),
            quality: Quality::new(self.output.quality),
        }
    }

    pub fn session_settings(&self, kind: PostKind, base: &Path) -> SessionSettings {
        SessionSettings {
            kind,
            default_ratio: self.ratio_for(kind),
            viewport: self.viewport(),
            output: self.output_config(base),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(dir = %dir.display(), ?config, "loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Postframe Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Ratio lock
# ---------------------------------------------------------------------------
[ratios]
# Ratio a post locks to when its first asset is selected, unless the ratio
# picker chose another one before that. Allowed: "1:1", "4:5", "16:9".
# Output sizes are fixed: 1080x1080, 1080x1350, 1920x1080.
photo = "4:5"
reel = "16:9"

# ---------------------------------------------------------------------------
# Finalized bitmaps
# ---------------------------------------------------------------------------
[output]
# JPEG quality (1-100).
quality = 90
# Output directory, relative to the config directory unless absolute.
dir = "finalized"

# ---------------------------------------------------------------------------
# Viewport
# ---------------------------------------------------------------------------
[viewport]
# Space available for the crop frame, in display units. The frame is the
# largest box of the locked ratio that fits inside it.
width = 390.0
height = 390.0
"##
}
