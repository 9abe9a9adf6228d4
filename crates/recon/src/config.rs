use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompareConfig {
    pub name: String,
    #[serde(default)]
    pub bands: TierBands,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            bands: TierBands::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tolerance bands
// ---------------------------------------------------------------------------

/// Relative-difference ceilings, both inclusive.
///
/// `relative <= close` is Close, `relative <= moderate` is Moderate, anything
/// larger is a Miss. An exact match is always Exact regardless of bands.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TierBands {
    #[serde(default = "default_close")]
    pub close: f64,
    #[serde(default = "default_moderate")]
    pub moderate: f64,
}

fn default_close() -> f64 {
    0.05
}

fn default_moderate() -> f64 {
    0.15
}

impl Default for TierBands {
    fn default() -> Self {
        Self {
            close: default_close(),
            moderate: default_moderate(),
        }
    }
}

impl CompareConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: CompareConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let TierBands { close, moderate } = self.bands;

        if !close.is_finite() || !moderate.is_finite() {
            return Err(ReconError::ConfigValidation(format!(
                "bands must be finite, got close={close} moderate={moderate}"
            )));
        }

        if close < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "bands.close must be >= 0, got {close}"
            )));
        }

        if close > moderate {
            return Err(ReconError::ConfigValidation(format!(
                "bands.close ({close}) must not exceed bands.moderate ({moderate})"
            )));
        }

        Ok(())
    }
}
