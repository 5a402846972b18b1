//! # Polymetry Core Library
//!
//! A high-performance library for polymer-physics analysis of protein conformational
//! ensembles, computing distance maps, internal scaling profiles, scaling-exponent
//! fits, and related structural observables from molecular-dynamics trajectories.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear
//! separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models (`Topology`,
//!   `Trajectory`), pure geometric primitives (center-of-mass, gyration tensor,
//!   superposed RMSD), and I/O utilities for trajectories, weights, and results.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer owns the residue-indexing
//!   model (`Protein`), the memoized atom-lookup caches, and the statistical
//!   machinery: distance maps, internal scaling curves, the power-law scaling
//!   estimator with bootstrap bounds, and contact analyses.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level, user-facing
//!   layer. It ties the `engine` and `core` together to execute a complete
//!   ensemble analysis and collect the results into a single report. It provides
//!   a simple and powerful entry point for end-users of the library.

pub mod core;
pub mod engine;
pub mod workflows;
