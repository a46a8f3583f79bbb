// 6.0 config.rs: all calculator settings in one place. margin and index params.
// 6.1 presets are plain constructors; validate() before use.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::index::{IndexParams, STANDARD_SCENARIO_COUNT};
use crate::margin::MarginParams;

// Complete configuration for the calculator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    #[serde(default)]
    pub margin: MarginParams,
    #[serde(default)]
    pub index: IndexParams,
}

impl CalculatorConfig {
    // Strict preset: every risk array must carry the standard 16 scenarios
    pub fn strict() -> Self {
        let mut config = Self::default();
        config.index.enforce_scenario_count = true;
        config.index.expected_scenarios = STANDARD_SCENARIO_COUNT;
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|err| ConfigError::Parse {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| ConfigError::Parse {
            reason: format!("{}: {err}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.margin.exposure_rate < Decimal::ZERO || self.margin.exposure_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidMargin {
                reason: "exposure rate must be in [0, 1)".to_string(),
            });
        }

        if self.index.expected_scenarios == 0 {
            return Err(ConfigError::InvalidIndex {
                reason: "expected scenario count must be positive".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid margin config: {reason}")]
    InvalidMargin { reason: String },
    #[error("invalid index config: {reason}")]
    InvalidIndex { reason: String },
    #[error("could not read config: {reason}")]
    Parse { reason: String },
}
