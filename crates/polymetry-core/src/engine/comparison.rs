use nalgebra::{DMatrix, Point3};
use serde::Deserialize;

use super::error::AnalysisError;
use super::protein::Protein;
use crate::core::models::ids::{ResidueId, ResidueIndex};
use crate::core::models::selection::AtomScope;
use crate::core::utils::geometry;

/// Optimal-superposition RMSD of every frame against a reference frame, in
/// Angstrom.
///
/// The comparison covers the atoms of the optionally bounded residue region,
/// caps included, restricted to backbone atoms when `backbone_only` is set.
/// Each frame is rigidly superposed onto the reference before the deviation
/// is measured, so rigid-body motion never contributes.
pub fn rmsd(
    protein: &Protein<'_>,
    reference_frame: usize,
    first: Option<ResidueIndex>,
    last: Option<ResidueIndex>,
    backbone_only: bool,
) -> Result<Vec<f64>, AnalysisError> {
    let trajectory = protein.trajectory();
    let (_, _, selection) = protein.first_and_last(first, last, false)?;
    let selection = if backbone_only {
        selection.with_scope(AtomScope::Backbone)
    } else {
        selection
    };
    let atoms = trajectory.topology().select(&selection);
    if atoms.is_empty() {
        return Err(AnalysisError::EmptyRegion);
    }

    let reference_coords =
        trajectory
            .frame(reference_frame)
            .ok_or(AnalysisError::FrameOutOfRange {
                frame: reference_frame,
                n_frames: trajectory.n_frames(),
            })?;
    let reference: Vec<Point3<f64>> = atoms.iter().map(|&atom| reference_coords[atom]).collect();

    let mut series = Vec::with_capacity(trajectory.n_frames());
    for frame in 0..trajectory.n_frames() {
        let coords = trajectory
            .frame(frame)
            .ok_or_else(|| AnalysisError::Internal(format!("frame {frame} out of range")))?;
        let target: Vec<Point3<f64>> = atoms.iter().map(|&atom| coords[atom]).collect();
        let value = geometry::kabsch_rmsd(&reference, &target).ok_or_else(|| {
            AnalysisError::Internal("rigid-body superposition failed".to_string())
        })?;
        series.push(value);
    }
    Ok(series)
}

/// Backbone torsion identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DihedralAngle {
    Phi,
    Psi,
    Omega,
}

/// Per-frame backbone dihedral angles in degrees.
///
/// Columns follow `residues`: the residues for which the four defining atoms
/// resolve uniquely. Phi and omega are attributed to the later residue of the
/// peptide bond they span, psi to the earlier one.
#[derive(Debug, Clone)]
pub struct DihedralSeries {
    pub angle: DihedralAngle,
    pub residues: Vec<ResidueId>,
    /// Frames-by-residues matrix of angles.
    pub angles: DMatrix<f64>,
}

/// The atom index of `name` in the residue, when it resolves uniquely.
fn unique_atom(protein: &Protein<'_>, residue: ResidueId, name: &str) -> Option<usize> {
    match protein.atom_indices_named(residue, name).as_slice() {
        [index] => Some(*index),
        _ => None,
    }
}

/// The four atoms defining `angle` at `residue`, or `None` when a defining
/// atom is missing, duplicated, or across a chain break.
fn dihedral_quad(
    protein: &Protein<'_>,
    angle: DihedralAngle,
    residue: ResidueId,
) -> Option<[usize; 4]> {
    let topology = protein.trajectory().topology();
    let this = topology.residue(residue)?;
    match angle {
        DihedralAngle::Phi => {
            let prev_id = ResidueId(residue.value().checked_sub(1)?);
            let prev = topology.residue(prev_id)?;
            if prev.chain_id != this.chain_id {
                return None;
            }
            Some([
                unique_atom(protein, prev_id, "C")?,
                unique_atom(protein, residue, "N")?,
                unique_atom(protein, residue, "CA")?,
                unique_atom(protein, residue, "C")?,
            ])
        }
        DihedralAngle::Psi => {
            let next_id = ResidueId(residue.value() + 1);
            let next = topology.residue(next_id)?;
            if next.chain_id != this.chain_id {
                return None;
            }
            Some([
                unique_atom(protein, residue, "N")?,
                unique_atom(protein, residue, "CA")?,
                unique_atom(protein, residue, "C")?,
                unique_atom(protein, next_id, "N")?,
            ])
        }
        DihedralAngle::Omega => {
            let prev_id = ResidueId(residue.value().checked_sub(1)?);
            let prev = topology.residue(prev_id)?;
            if prev.chain_id != this.chain_id {
                return None;
            }
            Some([
                unique_atom(protein, prev_id, "CA")?,
                unique_atom(protein, prev_id, "C")?,
                unique_atom(protein, residue, "N")?,
                unique_atom(protein, residue, "CA")?,
            ])
        }
    }
}

/// Computes one backbone dihedral for every residue where it is defined.
///
/// # Errors
///
/// [`AnalysisError::EmptyRegion`] when no residue carries the complete atom
/// quad, e.g. a single-residue chain.
pub fn dihedral_series(
    protein: &Protein<'_>,
    angle: DihedralAngle,
) -> Result<DihedralSeries, AnalysisError> {
    let trajectory = protein.trajectory();
    let mut residues = Vec::new();
    let mut quads = Vec::new();
    for position in 0..trajectory.topology().num_residues() {
        let id = ResidueId(position);
        if let Some(quad) = dihedral_quad(protein, angle, id) {
            residues.push(id);
            quads.push(quad);
        }
    }
    if quads.is_empty() {
        return Err(AnalysisError::EmptyRegion);
    }

    let mut angles = DMatrix::zeros(trajectory.n_frames(), quads.len());
    for frame in 0..trajectory.n_frames() {
        let coords = trajectory
            .frame(frame)
            .ok_or_else(|| AnalysisError::Internal(format!("frame {frame} out of range")))?;
        for (column, quad) in quads.iter().enumerate() {
            angles[(frame, column)] = geometry::dihedral_angle(
                &coords[quad[0]],
                &coords[quad[1]],
                &coords[quad[2]],
                &coords[quad[3]],
            );
        }
    }

    Ok(DihedralSeries {
        angle,
        residues,
        angles,
    })
}
