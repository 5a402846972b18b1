use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::contacts::ContactScheme;
use super::distances::DistanceMode;
use super::polymer::DeviationMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid value for `{parameter}`: {value} ({requirement})")]
    InvalidValue {
        parameter: &'static str,
        value: String,
        requirement: &'static str,
    },
}

fn ensure_stride(stride: usize) -> Result<(), ConfigError> {
    if stride == 0 {
        return Err(ConfigError::InvalidValue {
            parameter: "stride",
            value: stride.to_string(),
            requirement: "must be at least 1",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DistanceMapOptions {
    pub mode: DistanceMode,
    /// Report root-mean-square distances instead of mean distances.
    pub rms: bool,
    pub stride: usize,
}

impl Default for DistanceMapOptions {
    fn default() -> Self {
        Self {
            mode: DistanceMode::Marker,
            rms: false,
            stride: 1,
        }
    }
}

impl DistanceMapOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_stride(self.stride)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct InternalScalingOptions {
    /// Logical index of the first residue; `None` means the chain start
    /// (after an N-cap, if present).
    pub first_residue: Option<usize>,
    /// Logical index of the last residue; `None` means the chain end (before
    /// a C-cap, if present).
    pub last_residue: Option<usize>,
    pub mode: DistanceMode,
    pub stride: usize,
}

impl Default for InternalScalingOptions {
    fn default() -> Self {
        Self {
            first_residue: None,
            last_residue: None,
            mode: DistanceMode::Marker,
            stride: 1,
        }
    }
}

impl InternalScalingOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_stride(self.stride)
    }
}

/// Options for the scaling-exponent fit.
///
/// The defaults follow long-standing practice for disordered-protein
/// ensembles: the first 15 separations are dominated by short-range steric
/// structure and the last 5 by finite-chain end effects, so both are trimmed
/// before fitting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScalingFitOptions {
    /// Number of leading separations excluded from the fit.
    pub inter_residue_min: usize,
    /// Number of trailing separations excluded from the fit.
    pub end_effect: usize,
    /// Frames per bootstrap chunk.
    pub subdivision_batch_size: usize,
    pub mode: DistanceMode,
    /// Number of log-spaced points the fit is performed on.
    pub num_fitting_points: usize,
    /// Fraction of available points used when fewer than
    /// `num_fitting_points` survive trimming, or always when
    /// `fraction_override` is set.
    pub fraction_of_points: f64,
    pub fraction_override: bool,
    pub stride: usize,
}

impl Default for ScalingFitOptions {
    fn default() -> Self {
        Self {
            inter_residue_min: 15,
            end_effect: 5,
            subdivision_batch_size: 20,
            mode: DistanceMode::CenterOfMass,
            num_fitting_points: 40,
            fraction_of_points: 0.5,
            fraction_override: false,
            stride: 1,
        }
    }
}

impl ScalingFitOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_stride(self.stride)?;
        if !(self.fraction_of_points > 0.0 && self.fraction_of_points <= 1.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "fraction-of-points",
                value: self.fraction_of_points.to_string(),
                requirement: "must lie in (0, 1]",
            });
        }
        if self.num_fitting_points < 3 {
            return Err(ConfigError::InvalidValue {
                parameter: "num-fitting-points",
                value: self.num_fitting_points.to_string(),
                requirement: "a line cannot be fit to fewer than 3 points",
            });
        }
        if self.subdivision_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "subdivision-batch-size",
                value: self.subdivision_batch_size.to_string(),
                requirement: "must be at least 1",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ContactMapOptions {
    pub scheme: ContactScheme,
    /// Distance below which two residues count as in contact, in Angstrom.
    pub threshold: f64,
    pub stride: usize,
}

impl Default for ContactMapOptions {
    fn default() -> Self {
        Self {
            scheme: ContactScheme::ClosestHeavy,
            threshold: 5.0,
            stride: 1,
        }
    }
}

impl ContactMapOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_stride(self.stride)?;
        if self.threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "threshold",
                value: self.threshold.to_string(),
                requirement: "must be positive",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct NativeContactOptions {
    /// Heavy-atom distance below which a pair is native in the reference
    /// frame, in Angstrom.
    pub cutoff: f64,
    /// Smoothing steepness of the contact switching function, in 1/Angstrom.
    pub beta: f64,
    /// Fluctuation allowance multiplied onto each native distance.
    pub lambda: f64,
    /// Frame that defines the native state.
    pub reference_frame: usize,
    pub stride: usize,
}

impl Default for NativeContactOptions {
    fn default() -> Self {
        Self {
            cutoff: 4.5,
            beta: 5.0,
            lambda: 1.8,
            reference_frame: 0,
            stride: 1,
        }
    }
}

impl NativeContactOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_stride(self.stride)?;
        if self.cutoff <= 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "cutoff",
                value: self.cutoff.to_string(),
                requirement: "must be positive",
            });
        }
        if self.beta <= 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "beta",
                value: self.beta.to_string(),
                requirement: "must be positive",
            });
        }
        if self.lambda <= 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "lambda",
                value: self.lambda.to_string(),
                requirement: "must be positive",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PolymerScaledOptions {
    /// Smallest sequence separation for which deviations are computed.
    /// Shorter-range distances are dominated by local sterics, not polymer
    /// statistics.
    pub min_separation: usize,
    pub mode: DeviationMode,
    pub stride: usize,
}

impl Default for PolymerScaledOptions {
    fn default() -> Self {
        Self {
            min_separation: 10,
            mode: DeviationMode::FractionalChange,
            stride: 1,
        }
    }
}

impl PolymerScaledOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_stride(self.stride)?;
        if self.min_separation < 1 {
            return Err(ConfigError::InvalidValue {
                parameter: "min-separation",
                value: self.min_separation.to_string(),
                requirement: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// The full analysis configuration, loadable from a TOML file.
///
/// Every section and field is optional in the file; omitted values take the
/// documented defaults. Validation runs eagerly at load time so a bad value
/// fails before any computation starts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AnalysisConfig {
    pub residue_offset: usize,
    pub distance_map: DistanceMapOptions,
    pub internal_scaling: InternalScalingOptions,
    pub scaling_fit: ScalingFitOptions,
    pub contact_map: ContactMapOptions,
    pub native_contacts: NativeContactOptions,
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.distance_map.validate()?;
        self.internal_scaling.validate()?;
        self.scaling_fit.validate()?;
        self.contact_map.validate()?;
        self.native_contacts.validate()
    }
}
