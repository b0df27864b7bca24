//! # Settings Module
//!
//! ## Purpose
//! Numerical tolerances and the choice of linear solver used across StoichFlow.
//! Settings are stored as JSON; every field has a default so a partial file is valid.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "solver": "Svd",
//!   "svd_epsilon": 1e-12,
//!   "unity_tolerance": 0.01,
//!   "coefficient_precision": 2
//! }
//! ```
//!
//! ## Usage Pattern
//! ```rust
//! use StoichFlow::settings::Settings;
//!
//! let settings = Settings::load_or_default("stoichflow_config.json");
//! assert!(settings.unity_tolerance > 0.0);
//! ```
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read or write settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// linear solver backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverKind {
    /// least squares, minimum norm for rank deficient systems
    #[default]
    Svd,
    /// Householder QR, full column rank only
    Qr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub solver: SolverKind,
    /// singular values below this are treated as zero by the SVD solver
    pub svd_epsilon: f64,
    /// |R_ii| below this makes the QR solver report rank deficiency
    pub rank_tolerance: f64,
    /// balanced coefficients this close to 1 are not printed
    pub unity_tolerance: f64,
    /// decimals of printed balanced coefficients
    pub coefficient_precision: usize,
    /// max element residual accepted by the balancer
    pub balance_residual_tolerance: f64,
    /// extent residual norms above this are logged as warnings
    pub residual_warning: f64,
    /// upper bound of the multiplier search for integer coefficients
    pub max_integer_multiplier: u64,
    /// relative tolerance for "integral" scaled coefficients
    pub integer_tolerance: f64,
    /// computed flows below -flow_tolerance are logged as negative
    pub flow_tolerance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            solver: SolverKind::Svd,
            svd_epsilon: 1e-12,
            rank_tolerance: 1e-10,
            unity_tolerance: 0.01,
            coefficient_precision: 2,
            balance_residual_tolerance: 1e-6,
            residual_warning: 1e-3,
            max_integer_multiplier: 1000,
            integer_tolerance: 1e-9,
            flow_tolerance: 1e-9,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// missing or broken config falls back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(&path) {
            Ok(settings) => {
                info!("settings loaded from {}", path.as_ref().display());
                settings
            }
            Err(e) => {
                warn!(
                    "using default settings, {} not loaded: {}",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
