use nalgebra::{DMatrix, Matrix3, Point3};
use rand::Rng;
use serde::Deserialize;
use tracing::info;

use super::config::{ConfigError, DistanceMapOptions, PolymerScaledOptions, ScalingFitOptions};
use super::distances::{self, DistanceMode};
use super::error::AnalysisError;
use super::progress::ProgressReporter;
use super::protein::Protein;
use super::scaling;
use super::utils::stats;
use crate::core::models::ids::{ResidueId, ResidueIndex};
use crate::core::utils::geometry;

/// Interpolation constants from Nygaard M, Kragelund BB, Papaleo E,
/// Lindorff-Larsen K, Biophys J 113:550-557 (2017), equation 7. Altering them
/// breaks the published Rg-to-Rh mapping, so they are not configurable.
const RH_ALPHA1: f64 = 0.216;
const RH_ALPHA2: f64 = 4.06;
const RH_ALPHA3: f64 = 0.821;

/// How a cell of the polymer-scaled distance map quantifies deviation from
/// the homopolymer model distance `p = A0 * |i-j|^nu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviationMode {
    /// `|r - p| / p`
    FractionalChange,
    /// `(r - p) / p`; positive means expansion relative to the model.
    SignedFractionalChange,
    /// `r - p`, in Angstrom.
    SignedAbsoluteChange,
    /// `r / p`
    Scaled,
}

impl DeviationMode {
    fn apply(self, actual: f64, model: f64) -> f64 {
        match self {
            DeviationMode::FractionalChange => (actual - model).abs() / model,
            DeviationMode::SignedFractionalChange => (actual - model) / model,
            DeviationMode::SignedAbsoluteChange => actual - model,
            DeviationMode::Scaled => actual / model,
        }
    }
}

/// Distance map normalized against a homopolymer scaling model.
///
/// Cells closer than the minimum separation, the diagonal, and the lower
/// triangle are NaN rather than a mode-specific filler, so "not computed" and
/// "computed as zero" stay distinguishable.
#[derive(Debug, Clone)]
pub struct PolymerScaledMap {
    pub map: DMatrix<f64>,
    pub nu: f64,
    pub a0: f64,
    /// Goodness of fit of the scaling model; absent when the model
    /// parameters were supplied rather than fitted.
    pub reduced_chi: Option<f64>,
    pub residues: Vec<ResidueId>,
}

/// Per-frame mass-weighted radius of gyration over a residue region, in
/// Angstrom. `None` bounds default to the whole chain, caps included.
pub fn radius_of_gyration(
    protein: &Protein<'_>,
    first: Option<ResidueIndex>,
    last: Option<ResidueIndex>,
) -> Result<Vec<f64>, AnalysisError> {
    let (_, _, selection) = protein.first_and_last(first, last, false)?;
    let trajectory = protein.trajectory();
    let indices = trajectory.topology().select(&selection);
    if indices.is_empty() {
        return Err(AnalysisError::EmptyRegion);
    }
    let masses = atom_masses(protein, &indices);

    let mut series = Vec::with_capacity(trajectory.n_frames());
    for frame in 0..trajectory.n_frames() {
        let coords = frame_subset(protein, frame, &indices)?;
        let rg = geometry::radius_of_gyration(&coords, &masses).ok_or_else(|| {
            AnalysisError::Internal("radius of gyration over a degenerate atom set".to_string())
        })?;
        series.push(rg);
    }
    Ok(series)
}

/// Per-frame distance between the first and last marker-bearing residues, in
/// Angstrom.
pub fn end_to_end_distance(
    protein: &Protein<'_>,
    mode: DistanceMode,
) -> Result<Vec<f64>, AnalysisError> {
    let (&first, &last) = match (
        protein.marker_residues().first(),
        protein.marker_residues().last(),
    ) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(AnalysisError::NoMarkerResidues),
    };
    distances::pair_series(protein, first, last, mode, 1)
}

/// Gyration tensor of one frame: second moments of every atom position about
/// the mass-weighted center, normalized by the atom count. The asymmetric
/// normalization (mass-weighted center, unweighted moments) is deliberate and
/// matches the asphericity definition this feeds.
pub fn gyration_tensor(protein: &Protein<'_>, frame: usize) -> Result<Matrix3<f64>, AnalysisError> {
    let trajectory = protein.trajectory();
    let coords = trajectory
        .frame(frame)
        .ok_or(AnalysisError::FrameOutOfRange {
            frame,
            n_frames: trajectory.n_frames(),
        })?;
    let indices: Vec<usize> = (0..trajectory.topology().num_atoms()).collect();
    let masses = atom_masses(protein, &indices);
    let center = geometry::center_of_mass(coords, &masses)
        .ok_or_else(|| AnalysisError::Internal("gyration tensor of an empty frame".to_string()))?;
    geometry::gyration_tensor(coords, &center)
        .ok_or_else(|| AnalysisError::Internal("gyration tensor of an empty frame".to_string()))
}

/// Per-frame relative shape anisotropy in `[0, 1]` (0 sphere, 1 rod).
pub fn asphericity(protein: &Protein<'_>) -> Result<Vec<f64>, AnalysisError> {
    (0..protein.n_frames())
        .map(|frame| gyration_tensor(protein, frame).map(|tensor| geometry::asphericity(&tensor)))
        .collect()
}

/// Per-frame apparent hydrodynamic radius in Angstrom, converted from the
/// instantaneous Rg via the Nygaard et al. interpolation.
///
/// `N` is the marker-bearing residue count, so capping groups do not inflate
/// the chain length the model sees.
pub fn hydrodynamic_radius(protein: &Protein<'_>) -> Result<Vec<f64>, AnalysisError> {
    let n = protein.marker_residues().len();
    if n == 0 {
        return Err(AnalysisError::NoMarkerResidues);
    }
    let n = n as f64;
    let n_033 = n.powf(0.33);
    let n_060 = n.powf(0.60);

    Ok(radius_of_gyration(protein, None, None)?
        .into_iter()
        .map(|rg| {
            let rg_over_rh = (RH_ALPHA1 * (rg - RH_ALPHA2 * n_033)) / (n_060 - n_033) + RH_ALPHA3;
            rg / rg_over_rh
        })
        .collect())
}

/// Per-frame dimensionless size parameter
/// `t = 2.5 * (1.75 * Rg / (3.6 * N))^(4 / N^(1/3))`, where `3.6 * N` is the
/// contour length in Angstrom and `N` the marker-bearing residue count.
pub fn t_parameter(protein: &Protein<'_>) -> Result<Vec<f64>, AnalysisError> {
    let n = protein.marker_residues().len();
    if n == 0 {
        return Err(AnalysisError::NoMarkerResidues);
    }
    let n = n as f64;
    let contour_length = 3.6 * n;
    let exponent = 4.0 / n.powf(0.3333);

    Ok(radius_of_gyration(protein, None, None)?
        .into_iter()
        .map(|rg| 2.5 * (1.75 * (rg / contour_length)).powf(exponent))
        .collect())
}

/// Pearson correlation between the squared end-to-end distance and the
/// squared radius of gyration across frames.
///
/// Correlating the squares probes fractal consistency between the local and
/// global size measures; the Gaussian-chain scalar between the two second
/// moments cancels out of the correlation. NaN when either series is
/// constant or shorter than two frames.
pub fn end_to_end_rg_correlation(
    protein: &Protein<'_>,
    mode: DistanceMode,
) -> Result<f64, AnalysisError> {
    let e2e_sq: Vec<f64> = end_to_end_distance(protein, mode)?
        .into_iter()
        .map(|d| d * d)
        .collect();
    let rg_sq: Vec<f64> = radius_of_gyration(protein, None, None)?
        .into_iter()
        .map(|rg| rg * rg)
        .collect();
    Ok(stats::pearson(&e2e_sq, &rg_sq).unwrap_or(f64::NAN))
}

/// Compares every sufficiently separated inter-residue RMS distance against
/// the homopolymer model `A0 * |i-j|^nu`.
///
/// `params` supplies `(nu, A0)` directly; when absent, both are fitted first
/// with the default scaling-fit options, and the fit's reduced chi-square is
/// carried into the result. Supplying only one of the two parameters is
/// unrepresentable by construction. The underlying map uses center-of-mass
/// RMS distances, matching how the scaling fit itself measures the chain.
pub fn polymer_scaled_distance_map(
    protein: &Protein<'_>,
    params: Option<(f64, f64)>,
    opts: &PolymerScaledOptions,
    weights: Option<&[f64]>,
    rng: &mut impl Rng,
    reporter: &ProgressReporter<'_>,
) -> Result<PolymerScaledMap, AnalysisError> {
    opts.validate()?;

    let (nu, a0, reduced_chi) = match params {
        Some((nu, a0)) => {
            if !(nu > 0.0 && nu <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    parameter: "nu",
                    value: nu.to_string(),
                    requirement: "must lie in (0, 1]",
                }
                .into());
            }
            if a0 <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    parameter: "a0",
                    value: a0.to_string(),
                    requirement: "must be greater than 0",
                }
                .into());
            }
            (nu, a0, None)
        }
        None => {
            info!("Fitting the ensemble to a homopolymer model");
            let fit_opts = ScalingFitOptions {
                stride: opts.stride,
                ..Default::default()
            };
            let fit = scaling::scaling_exponent(protein, &fit_opts, weights, rng, reporter)?;
            (fit.nu, fit.a0, Some(fit.reduced_chi_full))
        }
    };

    let map_opts = DistanceMapOptions {
        mode: DistanceMode::CenterOfMass,
        rms: true,
        stride: opts.stride,
    };
    let distance_map = distances::distance_map(protein, &map_opts, weights, reporter)?;
    let n = distance_map.residues.len();
    if n <= opts.min_separation {
        return Err(ConfigError::InvalidValue {
            parameter: "min-separation",
            value: opts.min_separation.to_string(),
            requirement: "must be smaller than the number of marker residues",
        }
        .into());
    }

    let mut map = DMatrix::from_element(n, n, f64::NAN);
    for i in 0..n {
        for j in (i + opts.min_separation)..n {
            let model = a0 * ((j - i) as f64).powf(nu);
            map[(i, j)] = opts.mode.apply(distance_map.mean[(i, j)], model);
        }
    }

    Ok(PolymerScaledMap {
        map,
        nu,
        a0,
        reduced_chi,
        residues: distance_map.residues,
    })
}

fn atom_masses(protein: &Protein<'_>, indices: &[usize]) -> Vec<f64> {
    let topology = protein.trajectory().topology();
    indices
        .iter()
        .map(|&atom_index| {
            topology
                .atom(atom_index)
                .and_then(|atom| atom.mass())
                .unwrap_or(1.0)
        })
        .collect()
}

fn frame_subset(
    protein: &Protein<'_>,
    frame: usize,
    indices: &[usize],
) -> Result<Vec<Point3<f64>>, AnalysisError> {
    let trajectory = protein.trajectory();
    let coords = trajectory
        .frame(frame)
        .ok_or(AnalysisError::FrameOutOfRange {
            frame,
            n_frames: trajectory.n_frames(),
        })?;
    Ok(indices.iter().map(|&atom_index| coords[atom_index]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::TopologyBuilder;
    use crate::core::models::trajectory::Trajectory;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn chain_with_x(positions: &[Vec<f64>]) -> Trajectory {
        let n_residues = positions[0].len();
        let mut builder = TopologyBuilder::new();
        for i in 0..n_residues {
            builder
                .start_residue("GLY", (i + 1) as isize, 'A')
                .add_atom(i + 1, "CA", "C");
        }
        let frames: Vec<Vec<Point3<f64>>> = positions
            .iter()
            .map(|xs| xs.iter().map(|&x| Point3::new(x, 0.0, 0.0)).collect())
            .collect();
        Trajectory::new(builder.build(), frames).unwrap()
    }

    fn straight_chain(n_residues: usize, spacing: f64) -> Trajectory {
        let xs: Vec<f64> = (0..n_residues).map(|i| i as f64 * spacing).collect();
        chain_with_x(&[xs])
    }

    #[test]
    fn radius_of_gyration_of_symmetric_pair_is_the_half_distance() {
        let trajectory = chain_with_x(&[vec![-1.0, 1.0]]);
        let protein = Protein::new(&trajectory).unwrap();
        let rg = radius_of_gyration(&protein, None, None).unwrap();
        assert_eq!(rg.len(), 1);
        assert!((rg[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn radius_of_gyration_honors_the_region() {
        let trajectory = chain_with_x(&[vec![-1.0, 1.0, 50.0]]);
        let protein = Protein::new(&trajectory).unwrap();

        let partial =
            radius_of_gyration(&protein, Some(ResidueIndex(0)), Some(ResidueIndex(1))).unwrap();
        assert!((partial[0] - 1.0).abs() < 1e-12);

        let full = radius_of_gyration(&protein, None, None).unwrap();
        assert!(full[0] > 10.0);
    }

    #[test]
    fn default_region_is_offset_independent() {
        let trajectory = straight_chain(20, 2.0);
        let plain = Protein::new(&trajectory).unwrap();
        let shifted = Protein::with_offset(&trajectory, 1).unwrap();

        let expected = radius_of_gyration(&plain, None, None).unwrap();
        let offset = radius_of_gyration(&shifted, None, None).unwrap();
        assert_eq!(offset, expected);
    }

    #[test]
    fn end_to_end_distance_spans_the_marker_residues() {
        let trajectory = straight_chain(5, 2.0);
        let protein = Protein::new(&trajectory).unwrap();
        let e2e = end_to_end_distance(&protein, DistanceMode::Marker).unwrap();
        assert_eq!(e2e, vec![8.0]);
    }

    #[test]
    fn straight_chain_is_maximally_aspherical() {
        let trajectory = straight_chain(10, 3.8);
        let protein = Protein::new(&trajectory).unwrap();
        let asph = asphericity(&protein).unwrap();
        assert_eq!(asph.len(), 1);
        assert!((asph[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn gyration_tensor_rejects_out_of_range_frames() {
        let trajectory = straight_chain(4, 1.0);
        let protein = Protein::new(&trajectory).unwrap();
        let result = gyration_tensor(&protein, 5);
        assert!(matches!(
            result,
            Err(AnalysisError::FrameOutOfRange {
                frame: 5,
                n_frames: 1,
            })
        ));
    }

    #[test]
    fn hydrodynamic_radius_matches_the_interpolation_fixed_point() {
        // When Rg equals alpha2 * N^0.33 the interpolation numerator
        // vanishes and Rh reduces to Rg / alpha3 exactly.
        let n = 2.0_f64;
        let rg = RH_ALPHA2 * n.powf(0.33);
        let trajectory = chain_with_x(&[vec![-rg, rg]]);
        let protein = Protein::new(&trajectory).unwrap();

        let rh = hydrodynamic_radius(&protein).unwrap();
        assert!((rh[0] - rg / RH_ALPHA3).abs() < 1e-9);
    }

    #[test]
    fn t_parameter_is_exactly_the_prefactor_at_the_contour_ratio() {
        // Rg = 3.6 N / 1.75 makes the base of the power 1, so t = 2.5 for
        // any chain length exponent.
        let rg = 3.6 * 2.0 / 1.75;
        let trajectory = chain_with_x(&[vec![-rg, rg]]);
        let protein = Protein::new(&trajectory).unwrap();

        let t = t_parameter(&protein).unwrap();
        assert!((t[0] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn uniform_expansion_correlates_sizes_perfectly() {
        let base: Vec<f64> = (0..6).map(|i| i as f64 * 2.0).collect();
        let doubled: Vec<f64> = base.iter().map(|x| x * 2.0).collect();
        let tripled: Vec<f64> = base.iter().map(|x| x * 3.0).collect();
        let trajectory = chain_with_x(&[base, doubled, tripled]);
        let protein = Protein::new(&trajectory).unwrap();

        let r = end_to_end_rg_correlation(&protein, DistanceMode::Marker).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn scaled_map_is_unity_when_the_model_is_exact() {
        let trajectory = straight_chain(12, 2.0);
        let protein = Protein::new(&trajectory).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let opts = PolymerScaledOptions {
            min_separation: 3,
            mode: DeviationMode::Scaled,
            ..Default::default()
        };

        let result = polymer_scaled_distance_map(
            &protein,
            Some((1.0, 2.0)),
            &opts,
            None,
            &mut rng,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(result.reduced_chi.is_none());
        assert_eq!(result.map.nrows(), 12);
        for i in 0..12 {
            for j in 0..12 {
                let cell = result.map[(i, j)];
                if j >= i + 3 {
                    assert!((cell - 1.0).abs() < 1e-9, "cell ({i},{j}) was {cell}");
                } else {
                    assert!(cell.is_nan(), "cell ({i},{j}) should be NaN");
                }
            }
        }
    }

    #[test]
    fn signed_fractional_change_reports_expansion_against_a_compact_model() {
        let trajectory = straight_chain(12, 2.0);
        let protein = Protein::new(&trajectory).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // Model nu = 0.5 underestimates a fully extended chain.
        let opts = PolymerScaledOptions {
            min_separation: 2,
            mode: DeviationMode::SignedFractionalChange,
            ..Default::default()
        };
        let result = polymer_scaled_distance_map(
            &protein,
            Some((0.5, 2.0)),
            &opts,
            None,
            &mut rng,
            &ProgressReporter::new(),
        )
        .unwrap();

        for i in 0..12 {
            for j in (i + 2)..12 {
                assert!(result.map[(i, j)] > 0.0);
            }
        }
    }

    #[test]
    fn fitted_parameters_flow_into_the_map() {
        let trajectory = straight_chain(40, 2.0);
        let protein = Protein::new(&trajectory).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let result = polymer_scaled_distance_map(
            &protein,
            None,
            &PolymerScaledOptions::default(),
            None,
            &mut rng,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!((result.nu - 1.0).abs() < 1e-6);
        assert!((result.a0 - 2.0).abs() < 1e-6);
        let chi = result.reduced_chi.unwrap();
        assert!(chi.abs() < 1e-9);
        assert!((result.map[(0, 20)]).abs() < 1e-6);
    }

    #[test]
    fn parameter_validation_rejects_bad_models() {
        let trajectory = straight_chain(12, 2.0);
        let protein = Protein::new(&trajectory).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let reporter = ProgressReporter::new();

        for params in [Some((1.5, 2.0)), Some((0.5, -1.0))] {
            let result = polymer_scaled_distance_map(
                &protein,
                params,
                &PolymerScaledOptions::default(),
                None,
                &mut rng,
                &reporter,
            );
            assert!(matches!(result, Err(AnalysisError::Config { .. })));
        }

        let opts = PolymerScaledOptions {
            min_separation: 12,
            ..Default::default()
        };
        let too_wide = polymer_scaled_distance_map(
            &protein,
            Some((1.0, 2.0)),
            &opts,
            None,
            &mut rng,
            &reporter,
        );
        assert!(matches!(too_wide, Err(AnalysisError::Config { .. })));
    }
}
