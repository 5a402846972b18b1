use nalgebra::DMatrix;
use serde::Deserialize;
use tracing::debug;

use super::config::{ContactMapOptions, NativeContactOptions};
use super::distances;
use super::error::AnalysisError;
use super::progress::{Progress, ProgressReporter};
use super::protein::Protein;
use super::utils::stats;
use crate::core::models::ids::ResidueId;
use crate::core::utils::geometry;

/// Which atoms of each residue define the inter-residue contact distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactScheme {
    /// Point of closest approach over all atoms.
    Closest,
    /// Point of closest approach over non-hydrogen atoms.
    ClosestHeavy,
    /// Marker-atom to marker-atom distance.
    Ca,
    /// Closest approach over sidechain atoms.
    Sidechain,
    /// Closest approach over non-hydrogen sidechain atoms.
    SidechainHeavy,
}

impl ContactScheme {
    /// Atom indices of one residue participating in this scheme. May be
    /// empty, e.g. a glycine under a sidechain scheme.
    fn atoms(self, protein: &Protein<'_>, residue: ResidueId) -> Vec<usize> {
        if let ContactScheme::Ca = self {
            return protein.marker_index_by_id(residue).ok().into_iter().collect();
        }
        let atoms = protein.trajectory().topology().atoms();
        protein
            .atom_indices(residue)
            .iter()
            .copied()
            .filter(|&index| {
                let atom = &atoms[index];
                match self {
                    ContactScheme::ClosestHeavy => atom.is_heavy(),
                    ContactScheme::Sidechain => !atom.is_backbone(),
                    ContactScheme::SidechainHeavy => !atom.is_backbone() && atom.is_heavy(),
                    ContactScheme::Closest | ContactScheme::Ca => true,
                }
            })
            .collect()
    }
}

/// Fraction-of-frames contact statistics over the marker-bearing residues.
///
/// `fractions` is symmetric. `computed` marks the cells the sweep actually
/// evaluated: pairs closer than three positions along the marker sequence are
/// never evaluated, and neither are pairs where a residue contributes no atom
/// under the chosen scheme.
#[derive(Debug, Clone)]
pub struct ContactMap {
    pub fractions: DMatrix<f64>,
    pub computed: DMatrix<bool>,
    /// Per-residue contact order: row sums normalized by the number of
    /// evaluable partners, which shrinks near the chain ends.
    pub contact_order: Vec<f64>,
    pub residues: Vec<ResidueId>,
}

/// Builds the fractional contact map.
///
/// A cell holds the fraction of sampled frames (weighted, when weights are
/// supplied) in which the scheme distance between the two residues falls
/// below the threshold. Frame weights require stride 1.
pub fn contact_map(
    protein: &Protein<'_>,
    opts: &ContactMapOptions,
    weights: Option<&[f64]>,
    reporter: &ProgressReporter<'_>,
) -> Result<ContactMap, AnalysisError> {
    opts.validate()?;
    let weights = distances::checked_weights(protein, weights, opts.stride, false)?;

    let members = protein.marker_residues().to_vec();
    let n = members.len();
    if n == 0 {
        return Err(AnalysisError::NoMarkerResidues);
    }

    let scheme_atoms: Vec<Vec<usize>> = members
        .iter()
        .map(|&residue| opts.scheme.atoms(protein, residue))
        .collect();

    let trajectory = protein.trajectory();
    let sampled = trajectory
        .frame_indices(opts.stride)
        .map(|frame| {
            trajectory
                .frame(frame)
                .ok_or_else(|| AnalysisError::Internal(format!("frame {frame} out of range")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let total_weight = match &weights {
        Some(w) => w.iter().sum::<f64>(),
        None => sampled.len() as f64,
    };

    let mut fractions = DMatrix::zeros(n, n);
    let mut computed = DMatrix::from_element(n, n, false);

    reporter.report(Progress::TaskStart {
        total_steps: n.saturating_sub(3) as u64,
    });
    for i in 0..n.saturating_sub(3) {
        for j in (i + 3)..n {
            if scheme_atoms[i].is_empty() || scheme_atoms[j].is_empty() {
                continue;
            }
            let mut contact_weight = 0.0;
            for (position, coords) in sampled.iter().enumerate() {
                let closest = scheme_atoms[i]
                    .iter()
                    .flat_map(|&a| {
                        scheme_atoms[j]
                            .iter()
                            .map(move |&b| geometry::distance(&coords[a], &coords[b]))
                    })
                    .fold(f64::INFINITY, f64::min);
                if closest < opts.threshold {
                    contact_weight += match &weights {
                        Some(w) => w[position],
                        None => 1.0,
                    };
                }
            }
            let fraction = contact_weight / total_weight;
            fractions[(i, j)] = fraction;
            fractions[(j, i)] = fraction;
            computed[(i, j)] = true;
            computed[(j, i)] = true;
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let contact_order = (0..n)
        .map(|k| {
            // Residues within two positions of k, and k itself, are never
            // candidate partners.
            let excluded = k.min(2) + (n - 1 - k).min(2) + 1;
            let evaluable = (n - excluded) as f64;
            fractions.row(k).sum() / evaluable
        })
        .collect();

    Ok(ContactMap {
        fractions,
        computed,
        contact_order,
        residues: members,
    })
}

/// Native-contact statistics after Best, Hummer, and Eaton, "Native contacts
/// determine protein folding mechanisms in atomistic simulations", PNAS
/// (2013).
///
/// `q` is the per-frame soft fraction of native contacts; `pairs` lists the
/// native heavy-atom pairs found in the reference frame; `pair_q` is each
/// pair's (weighted) mean across frames; `residue_q` folds the pair means
/// into a symmetric residue-by-residue matrix, zero where no native pair
/// joins two residues.
#[derive(Debug, Clone)]
pub struct NativeContacts {
    pub q: Vec<f64>,
    pub pairs: Vec<(usize, usize)>,
    pub pair_q: Vec<f64>,
    pub residue_q: DMatrix<f64>,
}

/// Computes the soft native-contact fraction for every sampled frame.
///
/// Native pairs are heavy atoms more than three residues apart whose
/// reference-frame distance is below the cutoff; each then contributes
/// `1 / (1 + exp(beta * (r - lambda * r0)))` per frame. Frame weights apply
/// to the per-pair means only and require stride 1.
pub fn native_contacts(
    protein: &Protein<'_>,
    opts: &NativeContactOptions,
    weights: Option<&[f64]>,
) -> Result<NativeContacts, AnalysisError> {
    opts.validate()?;
    let weights = distances::checked_weights(protein, weights, opts.stride, false)?;

    let trajectory = protein.trajectory();
    let topology = trajectory.topology();
    let reference =
        trajectory
            .frame(opts.reference_frame)
            .ok_or(AnalysisError::FrameOutOfRange {
                frame: opts.reference_frame,
                n_frames: trajectory.n_frames(),
            })?;

    let heavy: Vec<usize> = (0..topology.num_atoms())
        .filter(|&index| topology.atoms()[index].is_heavy())
        .collect();

    let mut pairs = Vec::new();
    let mut native_distances = Vec::new();
    for (position, &a) in heavy.iter().enumerate() {
        let residue_a = topology.atoms()[a].residue_id.value();
        for &b in &heavy[position + 1..] {
            let residue_b = topology.atoms()[b].residue_id.value();
            if residue_a.abs_diff(residue_b) <= 3 {
                continue;
            }
            let r0 = geometry::distance(&reference[a], &reference[b]);
            if r0 < opts.cutoff {
                pairs.push((a, b));
                native_distances.push(r0);
            }
        }
    }
    debug!(
        native_pairs = pairs.len(),
        reference_frame = opts.reference_frame,
        "Identified native contact pairs"
    );

    let sampled = trajectory
        .frame_indices(opts.stride)
        .map(|frame| {
            trajectory
                .frame(frame)
                .ok_or_else(|| AnalysisError::Internal(format!("frame {frame} out of range")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let total_weight = match &weights {
        Some(w) => w.iter().sum::<f64>(),
        None => sampled.len() as f64,
    };

    let mut q = Vec::with_capacity(sampled.len());
    let mut pair_q_sums = vec![0.0; pairs.len()];
    for (position, coords) in sampled.iter().enumerate() {
        let frame_weight = match &weights {
            Some(w) => w[position],
            None => 1.0,
        };
        let mut frame_values = Vec::with_capacity(pairs.len());
        for (pair_index, &(a, b)) in pairs.iter().enumerate() {
            let r = geometry::distance(&coords[a], &coords[b]);
            let r0 = native_distances[pair_index];
            let value = 1.0 / (1.0 + (opts.beta * (r - opts.lambda * r0)).exp());
            pair_q_sums[pair_index] += frame_weight * value;
            frame_values.push(value);
        }
        q.push(stats::mean(&frame_values).unwrap_or(f64::NAN));
    }

    let pair_q: Vec<f64> = pair_q_sums
        .into_iter()
        .map(|sum| sum / total_weight)
        .collect();

    let n_res = topology.num_residues();
    let mut residue_sums: DMatrix<f64> = DMatrix::zeros(n_res, n_res);
    let mut residue_counts: DMatrix<f64> = DMatrix::zeros(n_res, n_res);
    for (pair_index, &(a, b)) in pairs.iter().enumerate() {
        let r1 = topology.atoms()[a].residue_id.value();
        let r2 = topology.atoms()[b].residue_id.value();
        residue_sums[(r1, r2)] += pair_q[pair_index];
        residue_sums[(r2, r1)] += pair_q[pair_index];
        residue_counts[(r1, r2)] += 1.0;
        residue_counts[(r2, r1)] += 1.0;
    }
    let residue_q = DMatrix::from_fn(n_res, n_res, |r, c| {
        if residue_counts[(r, c)] > 0.0 {
            residue_sums[(r, c)] / residue_counts[(r, c)]
        } else {
            0.0
        }
    });

    Ok(NativeContacts {
        q,
        pairs,
        pair_q,
        residue_q,
    })
}
