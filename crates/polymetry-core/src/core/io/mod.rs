//! Provides input/output functionality for trajectory analysis.
//!
//! This module contains the trajectory file reader, the per-frame weight-file
//! loader, and CSV export of analysis results. It provides a unified
//! trait-based interface for trajectory input so additional formats can be
//! added without touching the analysis layers.

pub mod export;
pub mod pdb;
pub mod traits;
pub mod weights;
