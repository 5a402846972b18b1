//! Utility functions for the engine module.
//!
//! This module provides the numeric helpers that support the analysis
//! engines: summary statistics, the ordinary-least-squares line fit used by
//! the scaling estimator, and the random-resampling primitives behind
//! weighted averaging and bootstrap error bounds.

pub mod resample;
pub mod stats;
