//! # Core Models Module
//!
//! This module contains the fundamental data structures used to represent
//! conformational ensembles in Polymetry, providing the foundation for all
//! analysis operations.
//!
//! ## Overview
//!
//! The models module defines the core abstractions for representing trajectory
//! data, including atoms, residues, the topology that organizes them, and the
//! frame stack of coordinates. These models are designed to:
//!
//! - **Represent ensemble structure** - One topology shared by many frames of
//!   atomic coordinates
//! - **Support efficient queries** - Dense, index-based storage so residue and
//!   atom lookups are array accesses
//! - **Maintain type safety** - Logical and true residue identifiers are
//!   distinct types, so an offset can never be applied twice
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom representation with name and element
//! - [`residue`] - Residue structure holding its atoms and source numbering
//! - [`topology`] - The ordered residue/atom store and its builder
//! - [`selection`] - Atom-subset selection expressions resolved by the topology
//! - [`trajectory`] - The topology paired with per-frame coordinates
//! - [`ids`] - Typed residue identifiers (logical index vs. true id)

pub mod atom;
pub mod ids;
pub mod residue;
pub mod selection;
pub mod topology;
pub mod trajectory;
