//! Configuration file loading.
//!
//! An optional `sharpline.toml` in the working directory overrides the
//! evaluation thresholds and engine options:
//!
//! ```toml
//! [thresholds]
//! blunder = 3.0
//! inaccuracy = 0.5
//!
//! [engine]
//! threads = 4
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sharp_analysis::Thresholds;
use sharp_uci::EngineOptions;

/// Errors when loading or parsing the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tool configuration: evaluation thresholds and engine options.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SharpConfig {
    /// Move-quality thresholds, in pawns.
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Options sent to the engine after the handshake.
    #[serde(default)]
    pub engine: EngineOptions,
}

impl SharpConfig {
    /// Loads the configuration from [`Self::config_path`]. A missing file
    /// yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// `sharpline.toml` in the current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("sharpline.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_library_defaults() {
        let config = SharpConfig::default();
        assert_eq!(config.engine, EngineOptions::default());
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: SharpConfig = toml::from_str(
            r#"
            [thresholds]
            blunder = 2.5

            [engine]
            threads = 8
            "#,
        )
        .expect("parse");
        assert_eq!(config.thresholds.blunder, 2.5);
        assert_eq!(config.thresholds.mistake, Thresholds::default().mistake);
        assert_eq!(config.engine.threads, 8);
        assert_eq!(config.engine.multi_pv, 1);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: SharpConfig = toml::from_str("").expect("parse");
        assert_eq!(config.thresholds, Thresholds::default());
    }
}
