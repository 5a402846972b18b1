//! # Core Module
//!
//! This module provides the foundational data structures and geometric primitives
//! for trajectory analysis in Polymetry, serving as the stateless substrate the
//! analysis engine is built on.
//!
//! ## Overview
//!
//! The core module owns everything that exists before any analysis is requested:
//! the in-memory representation of a conformational ensemble (topology plus
//! per-frame coordinates), pure geometry routines, compile-time chemical
//! identifier tables, and file I/O for trajectories, per-frame weights, and
//! exported results.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, topology,
//!   trajectory frames, and the typed residue identifiers
//! - **Geometric Primitives** ([`utils`]) - Distances, centers of mass, gyration
//!   tensors, superposition, dihedrals, and static identifier tables
//! - **File I/O** ([`io`]) - Multi-model PDB reading, weight-file loading, and
//!   CSV result export
//!
//! Everything in this layer is immutable once constructed; all statefulness
//! (caching, memoization) lives in the `engine` layer above.

pub mod io;
pub mod models;
pub mod utils;
