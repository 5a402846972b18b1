//! # Workflows Module
//!
//! This module provides the high-level workflow that orchestrates a complete
//! conformational-ensemble analysis in Polymetry.
//!
//! ## Overview
//!
//! Workflows are the top-level entry points for users of Polymetry. They tie
//! the engine's individual analyses together into one pass over a loaded
//! trajectory, handling handle construction, configuration validation,
//! progress reporting, and result aggregation behind a single function call.
//!
//! ## Architecture
//!
//! The module is organized around one analysis pipeline:
//!
//! - **Ensemble Analysis** ([`analyze`]) - Complete ensemble characterization
//!   covering the inter-residue distance map, the internal scaling profile,
//!   the apparent scaling-exponent fit, per-frame polymer observables, and
//!   the contact analyses.
//!
//! ## Key Capabilities
//!
//! - **End-to-end analysis** from a parsed trajectory to an aggregated report
//! - **Progress monitoring** with per-phase and per-task reporting
//! - **Reweighting support** threading frame weights through every phase
//! - **Deterministic resampling** through a caller-supplied random source

pub mod analyze;
