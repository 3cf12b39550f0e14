//! Simulation parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),
    #[error("field of view must be within (0, 360] degrees, got {0}")]
    InvalidFieldOfView(f64),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Pace ticks to wall-clock time.
    pub real_time: bool,
    /// Seconds per tick.
    pub time_step: f64,
    /// Aperture in degrees of the cone used by polygonal observations. `None` sees all around.
    pub field_of_view: Option<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            real_time: false,
            time_step: 0.1,
            field_of_view: None,
        }
    }
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(ConfigError::InvalidTimeStep(self.time_step));
        }
        if let Some(aperture) = self.field_of_view {
            if !(aperture > 0.0 && aperture <= 360.0) {
                return Err(ConfigError::InvalidFieldOfView(aperture));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(
            ModelConfig::from_json_str("{}").unwrap(),
            ModelConfig::default()
        );
    }

    #[test]
    fn test_partial_override() {
        let config =
            ModelConfig::from_json_str(r#"{ "real_time": true, "field_of_view": 90 }"#).unwrap();
        assert_eq!(
            config,
            ModelConfig {
                real_time: true,
                time_step: 0.1,
                field_of_view: Some(90.0),
            }
        );
    }

    #[rstest]
    #[case::zero_time_step(r#"{ "time_step": 0 }"#)]
    #[case::negative_time_step(r#"{ "time_step": -0.5 }"#)]
    #[case::no_aperture(r#"{ "field_of_view": 0 }"#)]
    #[case::wide_aperture(r#"{ "field_of_view": 400 }"#)]
    #[case::unknown_field(r#"{ "timestep": 0.2 }"#)]
    #[case::not_json("time_step = 0.2")]
    fn test_rejected(#[case] json: &str) {
        assert!(ModelConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_validate_non_finite_time_step() {
        let config = ModelConfig {
            time_step: f64::NAN,
            ..ModelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeStep(_))
        ));
    }
}
