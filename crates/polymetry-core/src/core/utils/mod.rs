//! Utility functions for the core module.
//!
//! This module provides the pure building blocks shared by every analysis:
//! geometric primitives over coordinate slices and compile-time identifier
//! tables for atom and element classification.

pub mod geometry;
pub mod identifiers;
