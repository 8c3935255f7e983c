/// Engine configuration, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::blueprint::{usable_boost, LEARNING_THEME_BOOST};

pub const DEFAULT_FEATURE_FLAG_KEY: &str = "emotion_flow_enabled_ids";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed base seed. With a seed set, `FlowEngine::run` is deterministic
    /// per person; without one every run draws fresh entropy.
    pub seed: Option<u64>,
    pub learning_theme_boost: f64,
    /// Configuration key holding the enabled-ids list.
    pub feature_flag_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            learning_theme_boost: LEARNING_THEME_BOOST,
            feature_flag_key: DEFAULT_FEATURE_FLAG_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config. An unusable `learning_theme_boost` is replaced by
    /// the default.
    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        let mut config: Self = ron::from_str(input)?;
        config.learning_theme_boost = usable_boost(config.learning_theme_boost);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = EngineConfig::parse_ron("(seed: Some(42))").unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.learning_theme_boost, LEARNING_THEME_BOOST);
        assert_eq!(config.feature_flag_key, DEFAULT_FEATURE_FLAG_KEY);
    }

    #[test]
    fn unusable_boost_is_replaced() {
        for raw in ["-2.0", "0.25", "0.0"] {
            let config =
                EngineConfig::parse_ron(&format!("(learning_theme_boost: {})", raw)).unwrap();
            assert_eq!(config.learning_theme_boost, LEARNING_THEME_BOOST, "{}", raw);
        }
        let config = EngineConfig::parse_ron("(learning_theme_boost: 2.5)").unwrap();
        assert_eq!(config.learning_theme_boost, 2.5);
    }

    #[test]
    fn malformed_ron_is_an_error() {
        assert!(matches!(
            EngineConfig::parse_ron("(seed: "),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EngineConfig::load_from_ron(Path::new("/nonexistent/engine.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
