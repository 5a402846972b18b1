use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::ids::{ResidueId, ResidueIndex};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid analysis options: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Residue index {index} is out of range for a chain of {num_residues} residues")]
    InvalidResidueIndex {
        index: ResidueIndex,
        num_residues: usize,
    },

    #[error(
        "Residue index {index} with offset {offset} exceeds the chain of {num_residues} residues; \
         the index may already be offset"
    )]
    DoubleOffset {
        index: ResidueIndex,
        offset: usize,
        num_residues: usize,
    },

    #[error("Residue {residue} ({label}) has no marker atom")]
    MissingMarkerAtom { residue: ResidueId, label: String },

    #[error("Residue {residue} has {count} atoms named '{name}'; expected exactly one")]
    AmbiguousAtom {
        residue: ResidueId,
        name: String,
        count: usize,
    },

    #[error("Only {available} fitting points are available; at least 3 are required")]
    InsufficientFitPoints { available: usize },

    #[error("Weight vector has {actual} entries but the trajectory has {expected} frames")]
    WeightsMismatch { expected: usize, actual: usize },

    #[error("Frame {frame} is out of range for a trajectory of {n_frames} frames")]
    FrameOutOfRange { frame: usize, n_frames: usize },

    #[error("Frame weights require stride 1, got stride {stride}")]
    WeightedStrideUnsupported { stride: usize },

    #[error("The requested residue region is empty")]
    EmptyRegion,

    #[error("No residue in the selection carries a marker atom")]
    NoMarkerResidues,

    #[error("Internal logic error: {0}")]
    Internal(String),
}
