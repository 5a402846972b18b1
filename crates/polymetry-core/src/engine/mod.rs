//! # Engine Module
//!
//! This module implements the stateful analysis engine of Polymetry, providing
//! the computational framework for conformational-ensemble measurements over a
//! loaded trajectory.
//!
//! ## Overview
//!
//! The engine module orchestrates every analysis the library offers. It wraps
//! a trajectory in a [`protein::Protein`] handle that manages residue
//! numbering, marker-atom membership, and memoized lookups, and builds the
//! distance, scaling, polymer, contact, and comparison analyses on top of that
//! handle.
//!
//! ## Architecture
//!
//! The module is organized into specialized submodules that handle different
//! aspects of the analysis process:
//!
//! - **Configuration** ([`config`]) - Analysis options, defaults, and eager validation
//! - **Protein Handle** ([`protein`]) - Residue numbering, marker membership, and memoized lookups
//! - **Distance Analyses** ([`distances`]) - Inter-residue distance maps and internal scaling
//! - **Scaling Estimator** ([`scaling`]) - Apparent scaling-exponent fits with bootstrap bounds
//! - **Polymer Observables** ([`polymer`]) - Rg, end-to-end distance, shape, and hydrodynamics
//! - **Contact Analyses** ([`contacts`]) - Contact maps and native-contact fractions
//! - **Structural Comparison** ([`comparison`]) - Superposition RMSD and backbone dihedrals
//! - **Progress Monitoring** ([`progress`]) - Progress reporting and user feedback mechanisms
//! - **Error Handling** ([`error`]) - Engine-specific error types and error propagation

pub(crate) mod cache;
pub mod comparison;
pub mod config;
pub mod contacts;
pub mod distances;
pub mod error;
pub mod polymer;
pub mod progress;
pub mod protein;
pub mod scaling;
pub(crate) mod utils;
