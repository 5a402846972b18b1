use nalgebra::DMatrix;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::Deserialize;
use tracing::warn;

use super::config::{DistanceMapOptions, InternalScalingOptions};
use super::error::AnalysisError;
use super::progress::{Progress, ProgressReporter};
use super::protein::Protein;
use super::utils::{resample, stats};
use crate::core::models::ids::{ResidueId, ResidueIndex};
use crate::core::utils::geometry;

/// How the position of a residue is measured for distance purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMode {
    /// Distance between the residues' marker atoms.
    Marker,
    /// Distance between the residues' centers of mass.
    CenterOfMass,
}

/// Upper-triangular inter-residue distance statistics.
///
/// Cell `[i][j]` with `j > i` holds the (weighted) mean or RMS distance
/// between the `i`-th and `j`-th marker-bearing residues; the diagonal and
/// lower triangle stay at zero. `residues` names the matrix axes in order.
/// `std` is absent when frame weights were supplied: the weighted second
/// moment is not estimated by this design.
#[derive(Debug, Clone)]
pub struct DistanceMap {
    pub mean: DMatrix<f64>,
    pub std: Option<DMatrix<f64>>,
    pub residues: Vec<ResidueId>,
}

/// Pooled inter-residue distances grouped by sequence separation.
#[derive(Debug, Clone)]
pub struct InternalScaling {
    separations: Vec<usize>,
    groups: Vec<Vec<f64>>,
}

impl InternalScaling {
    pub fn separations(&self) -> &[usize] {
        &self.separations
    }

    pub fn groups(&self) -> &[Vec<f64>] {
        &self.groups
    }

    pub fn group(&self, separation: usize) -> Option<&[f64]> {
        self.groups.get(separation).map(Vec::as_slice)
    }

    /// Mean distance per separation; separations with no pairs are NaN.
    pub fn means(&self) -> Vec<f64> {
        self.groups
            .iter()
            .map(|group| stats::mean(group).unwrap_or(f64::NAN))
            .collect()
    }

    /// Root-mean-square distance per separation; separations with no pairs
    /// are NaN.
    pub fn rms(&self) -> Vec<f64> {
        self.groups
            .iter()
            .map(|group| {
                let squares: Vec<f64> = group.iter().map(|d| d * d).collect();
                stats::mean(&squares).map(f64::sqrt).unwrap_or(f64::NAN)
            })
            .collect()
    }
}

/// Validates per-frame weights against the trajectory and stride.
///
/// Returns the weights aligned to the sampled frames. Re-striding is only
/// legal where the caller can average arbitrary frame subsets; operations
/// built on frame resampling must pass `allow_restride = false` and fail.
pub(crate) fn checked_weights(
    protein: &Protein<'_>,
    weights: Option<&[f64]>,
    stride: usize,
    allow_restride: bool,
) -> Result<Option<Vec<f64>>, AnalysisError> {
    let Some(weights) = weights else {
        return Ok(None);
    };
    let expected = protein.n_frames();
    if weights.len() != expected {
        return Err(AnalysisError::WeightsMismatch {
            expected,
            actual: weights.len(),
        });
    }
    if stride.max(1) > 1 {
        if !allow_restride {
            return Err(AnalysisError::WeightedStrideUnsupported { stride });
        }
        warn!(stride, "Re-striding frame weights to the sampled frames");
        return Ok(Some(
            protein
                .trajectory()
                .frame_indices(stride)
                .map(|frame| weights[frame])
                .collect(),
        ));
    }
    Ok(Some(weights.to_vec()))
}

/// Per-frame distance series between two residues at the given stride.
pub(crate) fn pair_series(
    protein: &Protein<'_>,
    a: ResidueId,
    b: ResidueId,
    mode: DistanceMode,
    stride: usize,
) -> Result<Vec<f64>, AnalysisError> {
    let trajectory = protein.trajectory();
    let mut series = Vec::with_capacity(trajectory.n_frames_with_stride(stride));
    match mode {
        DistanceMode::Marker => {
            let atom_a = protein.marker_index_by_id(a)?;
            let atom_b = protein.marker_index_by_id(b)?;
            for frame in trajectory.frame_indices(stride) {
                let coords = trajectory.frame(frame).ok_or_else(|| {
                    AnalysisError::Internal(format!("frame {frame} out of range"))
                })?;
                series.push(geometry::distance(&coords[atom_a], &coords[atom_b]));
            }
        }
        DistanceMode::CenterOfMass => {
            let com_a = protein.residue_com(a)?;
            let com_b = protein.residue_com(b)?;
            for frame in trajectory.frame_indices(stride) {
                series.push(geometry::distance(&com_a[frame], &com_b[frame]));
            }
        }
    }
    Ok(series)
}

/// Per-frame distances between two residues given by logical index.
///
/// This is the composable primitive behind the maps and curves; the `_by_id`
/// variant serves call chains that already hold true ids.
pub fn inter_residue_distance(
    protein: &Protein<'_>,
    a: ResidueIndex,
    b: ResidueIndex,
    mode: DistanceMode,
    stride: usize,
) -> Result<Vec<f64>, AnalysisError> {
    let a = protein.offset_residue(a)?;
    let b = protein.offset_residue(b)?;
    inter_residue_distance_by_id(protein, a, b, mode, stride)
}

pub fn inter_residue_distance_by_id(
    protein: &Protein<'_>,
    a: ResidueId,
    b: ResidueId,
    mode: DistanceMode,
    stride: usize,
) -> Result<Vec<f64>, AnalysisError> {
    protein.ensure_marker(a)?;
    protein.ensure_marker(b)?;
    pair_series(protein, a, b, mode, stride)
}

/// Distances from one base residue to every other marker-bearing residue.
///
/// Returns a frames-by-partners matrix whose columns follow the marker
/// membership order, restricted to true ids greater than the base when
/// `only_c_terminal` is set. A base without a marker atom yields `Ok(None)`:
/// sweeps legitimately pass caps and must be able to skip them without
/// treating the miss as a failure.
pub fn partner_distances(
    protein: &Protein<'_>,
    base: ResidueIndex,
    mode: DistanceMode,
    only_c_terminal: bool,
    stride: usize,
) -> Result<Option<DMatrix<f64>>, AnalysisError> {
    let base = protein.offset_residue(base)?;
    partner_distances_by_id(protein, base, mode, only_c_terminal, stride)
}

pub fn partner_distances_by_id(
    protein: &Protein<'_>,
    base: ResidueId,
    mode: DistanceMode,
    only_c_terminal: bool,
    stride: usize,
) -> Result<Option<DMatrix<f64>>, AnalysisError> {
    if !protein.has_marker(base) {
        return Ok(None);
    }
    let partners: Vec<ResidueId> = protein
        .marker_residues()
        .iter()
        .copied()
        .filter(|&id| if only_c_terminal { id > base } else { id != base })
        .collect();

    let n_rows = protein.trajectory().n_frames_with_stride(stride);
    let mut matrix = DMatrix::zeros(n_rows, partners.len());
    for (column, &partner) in partners.iter().enumerate() {
        let series = pair_series(protein, base, partner, mode, stride)?;
        for (row, value) in series.into_iter().enumerate() {
            matrix[(row, column)] = value;
        }
    }
    Ok(Some(matrix))
}

/// Builds the upper-triangular distance map over all marker-bearing residues.
///
/// With `rms` set, cell values are `sqrt(mean(d^2))` (mean of squares first,
/// then the root). Frame weights replace the plain mean with
/// `sum(w*d)/sum(w)` and suppress the standard-deviation matrix.
pub fn distance_map(
    protein: &Protein<'_>,
    opts: &DistanceMapOptions,
    weights: Option<&[f64]>,
    reporter: &ProgressReporter<'_>,
) -> Result<DistanceMap, AnalysisError> {
    opts.validate()?;
    let weights = checked_weights(protein, weights, opts.stride, true)?;

    let residues = protein.marker_residues().to_vec();
    if residues.is_empty() {
        return Err(AnalysisError::NoMarkerResidues);
    }
    let n = residues.len();
    let mut mean = DMatrix::zeros(n, n);
    let mut std = weights.is_none().then(|| DMatrix::zeros(n, n));

    reporter.report(Progress::TaskStart {
        total_steps: n.saturating_sub(1) as u64,
    });
    for i in 0..n.saturating_sub(1) {
        for j in (i + 1)..n {
            let series = pair_series(protein, residues[i], residues[j], opts.mode, opts.stride)?;
            mean[(i, j)] = match &weights {
                Some(w) => {
                    if opts.rms {
                        let squares: Vec<f64> = series.iter().map(|d| d * d).collect();
                        stats::weighted_mean(&squares, w)
                            .map(f64::sqrt)
                            .unwrap_or(f64::NAN)
                    } else {
                        stats::weighted_mean(&series, w).unwrap_or(f64::NAN)
                    }
                }
                None => {
                    if opts.rms {
                        let squares: Vec<f64> = series.iter().map(|d| d * d).collect();
                        stats::mean(&squares).map(f64::sqrt).unwrap_or(f64::NAN)
                    } else {
                        stats::mean(&series).unwrap_or(f64::NAN)
                    }
                }
            };
            if let Some(std) = std.as_mut() {
                std[(i, j)] = stats::population_variance(&series)
                    .map(f64::sqrt)
                    .unwrap_or(f64::NAN);
            }
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    Ok(DistanceMap {
        mean,
        std,
        residues,
    })
}

/// Pools inter-residue distances by sequence separation over a region.
///
/// Separation `s` collects the per-frame distances of every marker-bearing
/// pair `(i, i+s)` inside the region, `s` from 0 to the region length. With
/// frame weights, each pair's series is first resampled with replacement
/// according to the weights (size preserved). This is a Monte-Carlo
/// reweighting approximation, not an exact weighted mean, and it requires
/// stride 1 so the weights align with the sampled frames.
pub fn internal_scaling(
    protein: &Protein<'_>,
    opts: &InternalScalingOptions,
    weights: Option<&[f64]>,
    rng: &mut impl Rng,
    reporter: &ProgressReporter<'_>,
) -> Result<InternalScaling, AnalysisError> {
    opts.validate()?;
    let weights = checked_weights(protein, weights, opts.stride, false)?;
    let sampler = match &weights {
        Some(w) => Some(WeightedIndex::new(w.iter().copied()).map_err(|e| {
            AnalysisError::Internal(format!("invalid frame weights for resampling: {e}"))
        })?),
        None => None,
    };

    let (first, last, _) = protein.first_and_last(
        opts.first_residue.map(ResidueIndex),
        opts.last_residue.map(ResidueIndex),
        true,
    )?;
    if !protein
        .marker_residues()
        .iter()
        .any(|&id| first <= id && id <= last)
    {
        return Err(AnalysisError::NoMarkerResidues);
    }

    let max_separation = last.value() - first.value();
    let mut separations = Vec::with_capacity(max_separation + 1);
    let mut groups = Vec::with_capacity(max_separation + 1);

    reporter.report(Progress::TaskStart {
        total_steps: (max_separation + 1) as u64,
    });
    for separation in 0..=max_separation {
        let mut pooled = Vec::new();
        for a in first.value()..=(last.value() - separation) {
            let a = ResidueId(a);
            let b = ResidueId(a.value() + separation);
            if !protein.has_marker(a) || !protein.has_marker(b) {
                continue;
            }
            let series = pair_series(protein, a, b, opts.mode, opts.stride)?;
            match &sampler {
                Some(dist) => pooled.extend(resample::resample_with_weights(&series, dist, rng)),
                None => pooled.extend(series),
            }
        }
        separations.push(separation);
        groups.push(pooled);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    Ok(InternalScaling {
        separations,
        groups,
    })
}
