use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{CalcuttaError, Result};
use crate::win_prob::Coefficients;

/// Diagnostics written next to fitted coefficients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitMetadata {
    pub games: usize,
    pub iterations: usize,
    pub log_likelihood: f64,
    pub brier_score: f64,
}

/// On-disk coefficients format (JSON).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoefficientsFile {
    pub intercept: f64,
    pub slope: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitMetadata>,
}

impl CoefficientsFile {
    pub fn coefficients(&self) -> Coefficients {
        Coefficients::new(self.intercept, self.slope)
    }
}

/// Where the coefficients in use came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoefficientSource {
    Fitted { path: PathBuf },
    Supplied,
    Theoretical { reason: String },
}

/// Coefficients plus their provenance, so a fallback is visible in output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadedCoefficients {
    pub coefficients: Coefficients,
    pub source: CoefficientSource,
}

impl LoadedCoefficients {
    pub fn theoretical(reason: impl Into<String>) -> Self {
        LoadedCoefficients {
            coefficients: Coefficients::THEORETICAL,
            source: CoefficientSource::Theoretical {
                reason: reason.into(),
            },
        }
    }

    /// Coefficients handed in directly by the caller.
    pub fn supplied(coefficients: Coefficients) -> Self {
        LoadedCoefficients {
            coefficients,
            source: CoefficientSource::Supplied,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, CoefficientSource::Theoretical { .. })
    }
}

/// Load fitted coefficients, falling back to the theoretical model when no
/// file is configured or the file does not exist.
///
/// A file that exists but cannot be read or parsed is an error.
pub fn load_coefficients(path: Option<&Path>) -> Result<LoadedCoefficients> {
    let Some(path) = path else {
        warn!("no coefficients file configured, using theoretical model");
        return Ok(LoadedCoefficients::theoretical("no coefficients file configured"));
    };

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "coefficients file not found, using theoretical model");
            return Ok(LoadedCoefficients::theoretical(format!(
                "{} not found",
                path.display()
            )));
        }
        Err(e) => return Err(CalcuttaError::io(path, e)),
    };

    let file: CoefficientsFile = serde_json::from_str(&contents)?;
    if !file.intercept.is_finite() || !file.slope.is_finite() {
        return Err(CalcuttaError::InvalidParameter {
            name: "coefficients",
            reason: format!("non-finite values in {}", path.display()),
        });
    }
    info!(
        path = %path.display(),
        intercept = file.intercept,
        slope = file.slope,
        "loaded fitted coefficients"
    );
    Ok(LoadedCoefficients {
        coefficients: file.coefficients(),
        source: CoefficientSource::Fitted {
            path: path.to_path_buf(),
        },
    })
}

pub fn save_coefficients(path: &Path, file: &CoefficientsFile) -> Result<()> {
    let json = serde_json::to_string_pretty(file)?;
    fs::write(path, json).map_err(|e| CalcuttaError::io(path, e))
}
