use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CalcuttaError, Result};
use crate::payout::PayoutTable;
use crate::propagate::PropagationParams;
use crate::tournament::DEFAULT_POOL_TOLERANCE;

/// Engine configuration, read from TOML. Every section is optional.
///
/// ```toml
/// [propagation]
/// regional_final_decay = 0.75
/// elite_opponent_rating = 0.95
///
/// [payout]
/// rounds = [0.0, 0.015, 0.015, 0.05, 0.12, 0.20]
///
/// [model]
/// coefficients_path = "coefficients.json"
///
/// [validation]
/// pool_tolerance = 0.03
///
/// [pool]
/// size = 25000.0
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub propagation: PropagationParams,
    pub payout: PayoutTable,
    pub model: ModelConfig,
    pub validation: ValidationConfig,
    pub pool: PoolConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ModelConfig {
    pub coefficients_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValidationConfig {
    pub pool_tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            pool_tolerance: DEFAULT_POOL_TOLERANCE,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PoolConfig {
    /// Projected total pool in currency units, if known.
    pub size: Option<f64>,
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CalcuttaError::io(path, e))?;
        let mut config = Self::parse(&contents)?;
        // Relative coefficient paths are resolved against the config file.
        if let (Some(coef), Some(dir)) = (config.model.coefficients_path.as_mut(), path.parent()) {
            if coef.is_relative() {
                *coef = dir.join(&*coef);
            }
        }
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.propagation.validate()?;
        self.payout.validate()?;
        let tolerance = self.validation.pool_tolerance;
        if !(tolerance >= 0.0 && tolerance.is_finite()) {
            return Err(CalcuttaError::InvalidParameter {
                name: "pool_tolerance",
                reason: format!("must be a non-negative number, got {tolerance}"),
            });
        }
        if let Some(size) = self.pool.size {
            if !(size > 0.0 && size.is_finite()) {
                return Err(CalcuttaError::InvalidParameter {
                    name: "pool.size",
                    reason: format!("must be positive, got {size}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config.propagation, PropagationParams::default());
        assert_eq!(config.payout, PayoutTable::default());
        assert_eq!(config.validation.pool_tolerance, DEFAULT_POOL_TOLERANCE);
        assert!(config.model.coefficients_path.is_none());
        assert!(config.pool.size.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::parse(
            r#"
            [propagation]
            regional_final_decay = 0.85

            [pool]
            size = 12000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.propagation.regional_final_decay, 0.85);
        assert_eq!(
            config.propagation.elite_opponent_rating,
            PropagationParams::DEFAULT_ELITE_OPPONENT_RATING
        );
        assert_eq!(config.pool.size, Some(12000.0));
    }

    #[test]
    fn test_unbalanced_payout_rejected() {
        let err = EngineConfig::parse(
            r#"
            [payout]
            rounds = [0.0, 0.02, 0.02, 0.05, 0.12, 0.20]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CalcuttaError::PayoutTable { .. }));
    }

    #[test]
    fn test_bad_elite_rating_rejected() {
        let err = EngineConfig::parse(
            r#"
            [propagation]
            elite_opponent_rating = 1.5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CalcuttaError::InvalidParameter { .. }));
    }

    #[test]
    fn test_load_resolves_relative_coefficients_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "[model]\ncoefficients_path = \"coef.json\"\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(
            config.model.coefficients_path,
            Some(dir.path().join("coef.json"))
        );
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, CalcuttaError::Io { .. }));
    }
}
