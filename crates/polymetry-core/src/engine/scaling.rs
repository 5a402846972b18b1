use rand::distributions::WeightedIndex;
use rand::prelude::*;
use tracing::warn;

use super::config::ScalingFitOptions;
use super::distances;
use super::error::AnalysisError;
use super::progress::{Progress, ProgressReporter};
use super::protein::Protein;
use super::utils::{resample, stats};
use crate::core::models::ids::ResidueId;

/// One point of the internal-scaling curve with the fitted model overlaid.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePoint {
    pub separation: usize,
    pub rms: f64,
    pub model: f64,
}

/// Structured record of the designed fitting-point fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FitFallback {
    /// The requested point count was available; no fallback applied.
    None,
    /// Too few separations survived trimming (or the fraction was forced), so
    /// the fit used `used` points instead of the `requested` count.
    FractionOfAvailable { requested: usize, used: usize },
}

/// Result of the power-law fit `rms(s) = A0 * s^nu`.
#[derive(Debug, Clone)]
pub struct ScalingFit {
    pub nu: f64,
    pub a0: f64,
    /// Min/max of `nu` across the bootstrap chunks; NaN when no chunk fit.
    pub nu_bounds: (f64, f64),
    /// Min/max of `A0` across the bootstrap chunks; NaN when no chunk fit.
    pub a0_bounds: (f64, f64),
    /// Reduced chi-square over the fitted point subset.
    pub reduced_chi_fit: f64,
    /// Reduced chi-square over the whole trimmed curve.
    pub reduced_chi_full: f64,
    /// The log-spaced `(separation, rms)` points the fit ran on.
    pub fitted_points: Vec<(usize, f64)>,
    /// The whole trimmed curve with the model overlay.
    pub curve: Vec<CurvePoint>,
    pub fallback: FitFallback,
}

/// Per-separation accumulators, kept per sampled frame so bootstrap chunks
/// can rebuild exact RMS curves without revisiting coordinates.
struct SeparationAggregate {
    separation: usize,
    pairs: usize,
    sum: f64,
    sum_sq: f64,
    frame_sum_sq: Vec<f64>,
}

impl SeparationAggregate {
    fn samples(&self) -> usize {
        self.pairs * self.frame_sum_sq.len()
    }

    fn rms(&self) -> f64 {
        (self.sum_sq / self.samples() as f64).sqrt()
    }

    /// Biased (population) variance of the pooled distances.
    fn variance(&self) -> f64 {
        let n = self.samples() as f64;
        let mean = self.sum / n;
        self.sum_sq / n - mean * mean
    }

    fn chunk_rms(&self, chunk: &[usize]) -> f64 {
        let sum_sq: f64 = chunk.iter().map(|&pos| self.frame_sum_sq[pos]).sum();
        (sum_sq / (self.pairs * chunk.len()) as f64).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CurveSample {
    separation: usize,
    rms: f64,
    variance: f64,
}

struct FittedCurve {
    nu: f64,
    ln_a0: f64,
    selected: Vec<usize>,
    fallback: FitFallback,
}

/// Log-spaced point selection: `n_points` targets are spread evenly over the
/// log-separation span and each target picks the nearest curve index. The
/// targets are increasing, so consecutive claims of the same index collapse
/// into one and the selection stays strictly increasing; the two endpoints
/// always survive.
fn log_spaced_indices(samples: &[CurveSample], n_points: usize) -> Vec<usize> {
    let n = samples.len();
    if n_points >= n {
        return (0..n).collect();
    }

    let logs: Vec<f64> = samples
        .iter()
        .map(|sample| (sample.separation as f64).ln())
        .collect();
    let interval = (logs[n - 1] - logs[0]) / (n_points - 1) as f64;

    let mut selected = Vec::with_capacity(n_points);
    for slot in 0..n_points {
        let target = logs[0] + slot as f64 * interval;
        let upper = logs.partition_point(|&log| log < target);
        let nearest = if upper == 0 {
            0
        } else if upper == n {
            n - 1
        } else if target - logs[upper - 1] <= logs[upper] - target {
            upper - 1
        } else {
            upper
        };
        if selected.last() != Some(&nearest) {
            selected.push(nearest);
        }
    }
    selected
}

fn select_points(
    samples: &[CurveSample],
    opts: &ScalingFitOptions,
) -> Result<(Vec<usize>, FitFallback), AnalysisError> {
    let available = samples.len();
    let (n_points, fallback) = if opts.fraction_override || opts.num_fitting_points > available {
        let used = (available as f64 * opts.fraction_of_points).floor() as usize;
        warn!(
            requested = opts.num_fitting_points,
            available,
            used,
            "Falling back to a fraction of the available fitting points"
        );
        (
            used,
            FitFallback::FractionOfAvailable {
                requested: opts.num_fitting_points,
                used,
            },
        )
    } else {
        (opts.num_fitting_points, FitFallback::None)
    };

    if n_points < 3 {
        return Err(AnalysisError::InsufficientFitPoints { available: n_points });
    }
    Ok((log_spaced_indices(samples, n_points), fallback))
}

fn fit_log_log(samples: &[CurveSample], selected: &[usize]) -> Result<(f64, f64), AnalysisError> {
    let x: Vec<f64> = selected
        .iter()
        .map(|&i| (samples[i].separation as f64).ln())
        .collect();
    let y: Vec<f64> = selected.iter().map(|&i| samples[i].rms.ln()).collect();
    stats::fit_line(&x, &y).ok_or_else(|| {
        AnalysisError::Internal("degenerate separation axis in scaling fit".to_string())
    })
}

/// Reduced chi-square of the log-space residuals, each normalized by the
/// per-point distance variance. Zero-variance points contribute nothing when
/// the model passes through them exactly, which keeps noise-free synthetic
/// curves at chi-square zero instead of 0/0.
fn reduced_chi(samples: &[CurveSample], indices: &[usize], nu: f64, ln_a0: f64) -> f64 {
    let n = indices.len();
    if n <= 2 {
        return f64::NAN;
    }
    let sum: f64 = indices
        .iter()
        .map(|&i| {
            let sample = &samples[i];
            let residual = sample.rms.ln() - (nu * (sample.separation as f64).ln() + ln_a0);
            if sample.variance > 0.0 {
                residual * residual / sample.variance
            } else if residual.abs() < 1e-9 {
                0.0
            } else {
                f64::INFINITY
            }
        })
        .sum();
    sum / (n - 2) as f64
}

fn fit_curve(
    samples: &[CurveSample],
    opts: &ScalingFitOptions,
) -> Result<FittedCurve, AnalysisError> {
    let (selected, fallback) = select_points(samples, opts)?;
    let (nu, ln_a0) = fit_log_log(samples, &selected)?;
    Ok(FittedCurve {
        nu,
        ln_a0,
        selected,
        fallback,
    })
}

/// Drops the leading `inter_residue_min` and trailing `end_effect` entries.
fn trim_range(len: usize, opts: &ScalingFitOptions) -> std::ops::Range<usize> {
    let start = opts.inter_residue_min.min(len);
    let end = len.saturating_sub(opts.end_effect).max(start);
    start..end
}

fn build_aggregates(
    protein: &Protein<'_>,
    opts: &ScalingFitOptions,
    weights: Option<&[f64]>,
    rng: &mut impl Rng,
    reporter: &ProgressReporter<'_>,
) -> Result<Vec<SeparationAggregate>, AnalysisError> {
    let sampler = match weights {
        Some(w) => Some(WeightedIndex::new(w.iter().copied()).map_err(|e| {
            AnalysisError::Internal(format!("invalid frame weights for resampling: {e}"))
        })?),
        None => None,
    };

    let (first, last, _) = protein.first_and_last(None, None, true)?;
    let max_separation = last.value() - first.value();
    let trajectory = protein.trajectory();
    let n_sampled = trajectory.n_frames_with_stride(opts.stride);

    let mut aggregates = Vec::new();
    reporter.report(Progress::TaskStart {
        total_steps: max_separation as u64,
    });
    for separation in 1..=max_separation {
        let mut aggregate = SeparationAggregate {
            separation,
            pairs: 0,
            sum: 0.0,
            sum_sq: 0.0,
            frame_sum_sq: vec![0.0; n_sampled],
        };
        for a in first.value()..=(last.value() - separation) {
            let a = ResidueId(a);
            let b = ResidueId(a.value() + separation);
            if !protein.has_marker(a) || !protein.has_marker(b) {
                continue;
            }
            let mut series = distances::pair_series(protein, a, b, opts.mode, opts.stride)?;
            if let Some(dist) = &sampler {
                series = resample::resample_with_weights(&series, dist, rng);
            }
            aggregate.pairs += 1;
            for (position, d) in series.into_iter().enumerate() {
                aggregate.sum += d;
                aggregate.sum_sq += d * d;
                aggregate.frame_sum_sq[position] += d * d;
            }
        }
        if aggregate.pairs > 0 {
            aggregates.push(aggregate);
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    Ok(aggregates)
}

/// Fits the homopolymer power law `sqrt(<r^2>)(s) = A0 * s^nu` to the
/// internal-scaling RMS curve of the whole marker-bearing chain.
///
/// The curve is trimmed before fitting, a log-spaced subset of points is
/// selected (with the documented fraction fallback when the curve is short),
/// the fit runs as ordinary least squares in log-log space, and min/max
/// bootstrap bounds come from refitting per-chunk curves over a shuffled
/// partition of the sampled frames. Frame weights resample every pair's
/// series with replacement first and require stride 1.
pub fn scaling_exponent(
    protein: &Protein<'_>,
    opts: &ScalingFitOptions,
    weights: Option<&[f64]>,
    rng: &mut impl Rng,
    reporter: &ProgressReporter<'_>,
) -> Result<ScalingFit, AnalysisError> {
    opts.validate()?;
    let weights = distances::checked_weights(protein, weights, opts.stride, false)?;
    if protein.marker_residues().is_empty() {
        return Err(AnalysisError::NoMarkerResidues);
    }

    let aggregates = build_aggregates(protein, opts, weights.as_deref(), rng, reporter)?;
    let samples: Vec<CurveSample> = aggregates
        .iter()
        .map(|aggregate| CurveSample {
            separation: aggregate.separation,
            rms: aggregate.rms(),
            variance: aggregate.variance(),
        })
        .collect();

    let trimmed_range = trim_range(samples.len(), opts);
    let trimmed = &samples[trimmed_range.clone()];
    let fitted = fit_curve(trimmed, opts)?;

    let nu = fitted.nu;
    let a0 = fitted.ln_a0.exp();
    let all_indices: Vec<usize> = (0..trimmed.len()).collect();
    let reduced_chi_fit = reduced_chi(trimmed, &fitted.selected, nu, fitted.ln_a0);
    let reduced_chi_full = reduced_chi(trimmed, &all_indices, nu, fitted.ln_a0);

    let (nu_bounds, a0_bounds) = bootstrap_bounds(
        &aggregates[trimmed_range],
        &fitted.selected,
        protein.trajectory().n_frames_with_stride(opts.stride),
        opts,
        rng,
        reporter,
    );

    let fitted_points: Vec<(usize, f64)> = fitted
        .selected
        .iter()
        .map(|&i| (trimmed[i].separation, trimmed[i].rms))
        .collect();
    let curve: Vec<CurvePoint> = trimmed
        .iter()
        .map(|sample| CurvePoint {
            separation: sample.separation,
            rms: sample.rms,
            model: a0 * (sample.separation as f64).powf(nu),
        })
        .collect();

    Ok(ScalingFit {
        nu,
        a0,
        nu_bounds,
        a0_bounds,
        reduced_chi_fit,
        reduced_chi_full,
        fitted_points,
        curve,
        fallback: fitted.fallback,
    })
}

/// Min/max of `nu` and `A0` over refits on a shuffled frame partition.
///
/// The chunk count is `min(frames, frames / batch_size)`; when not even one
/// chunk fits, the bounds collapse to NaN rather than failing.
fn bootstrap_bounds(
    aggregates: &[SeparationAggregate],
    selected: &[usize],
    n_sampled: usize,
    opts: &ScalingFitOptions,
    rng: &mut impl Rng,
    reporter: &ProgressReporter<'_>,
) -> ((f64, f64), (f64, f64)) {
    let num_subdivisions = n_sampled.min(n_sampled / opts.subdivision_batch_size);
    if num_subdivisions < 1 {
        return ((f64::NAN, f64::NAN), (f64::NAN, f64::NAN));
    }

    let positions: Vec<usize> = (0..n_sampled).collect();
    let chunks = resample::shuffled_chunks(&positions, num_subdivisions, rng);
    let x: Vec<f64> = selected
        .iter()
        .map(|&i| (aggregates[i].separation as f64).ln())
        .collect();

    let mut nus = Vec::with_capacity(chunks.len());
    let mut a0s = Vec::with_capacity(chunks.len());
    reporter.report(Progress::TaskStart {
        total_steps: chunks.len() as u64,
    });
    for chunk in &chunks {
        let y: Vec<f64> = selected
            .iter()
            .map(|&i| aggregates[i].chunk_rms(chunk).ln())
            .collect();
        if let Some((nu, ln_a0)) = stats::fit_line(&x, &y) {
            if nu.is_finite() && ln_a0.is_finite() {
                nus.push(nu);
                a0s.push(ln_a0.exp());
            }
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let bounds = |values: &[f64]| {
        values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    };
    if nus.is_empty() {
        ((f64::NAN, f64::NAN), (f64::NAN, f64::NAN))
    } else {
        (bounds(&nus), bounds(&a0s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::TopologyBuilder;
    use crate::core::models::trajectory::Trajectory;
    use crate::engine::distances::DistanceMode;
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn power_law_samples(n: usize, nu: f64, a0: f64) -> Vec<CurveSample> {
        (1..=n)
            .map(|s| CurveSample {
                separation: s,
                rms: a0 * (s as f64).powf(nu),
                variance: 0.0,
            })
            .collect()
    }

    fn straight_chain(n_residues: usize, spacing: f64, n_frames: usize) -> Trajectory {
        let mut builder = TopologyBuilder::new();
        for i in 0..n_residues {
            builder
                .start_residue("GLY", (i + 1) as isize, 'A')
                .add_atom(i + 1, "CA", "C");
        }
        let frame: Vec<Point3<f64>> = (0..n_residues)
            .map(|i| Point3::new(i as f64 * spacing, 0.0, 0.0))
            .collect();
        Trajectory::new(builder.build(), vec![frame; n_frames]).unwrap()
    }

    #[test]
    fn exact_power_law_is_recovered_to_float_tolerance() {
        let samples = power_law_samples(50, 0.55, 2.0);
        let opts = ScalingFitOptions {
            inter_residue_min: 0,
            end_effect: 0,
            num_fitting_points: 40,
            ..Default::default()
        };

        let fitted = fit_curve(&samples, &opts).unwrap();
        assert_eq!(fitted.fallback, FitFallback::None);
        assert!((fitted.nu - 0.55).abs() < 1e-12);
        assert!((fitted.ln_a0.exp() - 2.0).abs() < 1e-12);

        let chi = reduced_chi(&samples, &fitted.selected, fitted.nu, fitted.ln_a0);
        assert!(chi.abs() < 1e-12);
    }

    #[test]
    fn trimming_does_not_disturb_an_exact_fit() {
        let samples = power_law_samples(50, 0.55, 2.0);
        let opts = ScalingFitOptions::default();

        let range = trim_range(samples.len(), &opts);
        assert_eq!(range, 15..45);
        let trimmed = &samples[range];

        let fitted = fit_curve(trimmed, &opts).unwrap();
        assert!(matches!(
            fitted.fallback,
            FitFallback::FractionOfAvailable {
                requested: 40,
                used: 15,
            }
        ));
        assert!((fitted.nu - 0.55).abs() < 1e-12);
    }

    #[test]
    fn log_spaced_selection_claims_each_slot_once() {
        let samples = power_law_samples(100, 0.5, 1.0);
        let selected = log_spaced_indices(&samples, 10);

        assert!(selected.len() <= 10);
        assert!(selected.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(selected.first(), Some(&0));
        assert_eq!(selected.last(), Some(&99));
    }

    #[test]
    fn short_curves_fall_back_and_then_fail_below_three_points() {
        let samples = power_law_samples(10, 0.5, 1.0);
        let opts = ScalingFitOptions {
            inter_residue_min: 0,
            end_effect: 0,
            ..Default::default()
        };
        let fitted = fit_curve(&samples, &opts).unwrap();
        assert_eq!(
            fitted.fallback,
            FitFallback::FractionOfAvailable {
                requested: 40,
                used: 5,
            }
        );

        let tiny = power_law_samples(4, 0.5, 1.0);
        let result = fit_curve(&tiny, &opts);
        assert!(matches!(
            result,
            Err(AnalysisError::InsufficientFitPoints { available: 2 })
        ));
    }

    #[test]
    fn forced_fraction_applies_even_when_enough_points_exist() {
        let samples = power_law_samples(50, 0.5, 1.0);
        let opts = ScalingFitOptions {
            inter_residue_min: 0,
            end_effect: 0,
            num_fitting_points: 10,
            fraction_override: true,
            ..Default::default()
        };
        let fitted = fit_curve(&samples, &opts).unwrap();
        assert_eq!(
            fitted.fallback,
            FitFallback::FractionOfAvailable {
                requested: 10,
                used: 25,
            }
        );
    }

    #[test]
    fn straight_chain_fits_nu_one_with_tight_bounds() {
        let trajectory = straight_chain(60, 3.8, 4);
        let protein = Protein::new(&trajectory).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let opts = ScalingFitOptions {
            inter_residue_min: 2,
            end_effect: 2,
            num_fitting_points: 10,
            subdivision_batch_size: 1,
            mode: DistanceMode::Marker,
            ..Default::default()
        };

        let fit = scaling_exponent(
            &protein,
            &opts,
            None,
            &mut rng,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!((fit.nu - 1.0).abs() < 1e-9, "nu was {}", fit.nu);
        assert!((fit.a0 - 3.8).abs() < 1e-6, "a0 was {}", fit.a0);
        assert!(fit.reduced_chi_fit.abs() < 1e-9);
        assert!(fit.reduced_chi_full.abs() < 1e-9);
        // Identical frames make every chunk refit identical.
        assert!((fit.nu_bounds.0 - 1.0).abs() < 1e-9);
        assert!((fit.nu_bounds.1 - 1.0).abs() < 1e-9);
        assert!((fit.a0_bounds.0 - 3.8).abs() < 1e-6);
        assert!(!fit.fitted_points.is_empty());
        assert!(fit.curve.iter().all(|p| (p.rms - p.model).abs() < 1e-6));
    }

    #[test]
    fn curve_extends_to_the_maximal_separation() {
        let trajectory = straight_chain(10, 3.8, 2);
        let protein = Protein::new(&trajectory).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let opts = ScalingFitOptions {
            inter_residue_min: 0,
            end_effect: 0,
            num_fitting_points: 5,
            subdivision_batch_size: 1,
            mode: DistanceMode::Marker,
            ..Default::default()
        };

        let fit = scaling_exponent(
            &protein,
            &opts,
            None,
            &mut rng,
            &ProgressReporter::new(),
        )
        .unwrap();

        // Untrimmed, the curve runs from separation 1 to the full
        // first-to-last span of the chain.
        assert_eq!(fit.curve.first().map(|p| p.separation), Some(1));
        assert_eq!(fit.curve.last().map(|p| p.separation), Some(9));
        assert!((fit.nu - 1.0).abs() < 1e-9);
    }

    #[test]
    fn offset_numbering_still_fits_the_whole_chain() {
        let trajectory = straight_chain(20, 3.8, 2);
        let protein = Protein::with_offset(&trajectory, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let opts = ScalingFitOptions {
            inter_residue_min: 2,
            end_effect: 2,
            num_fitting_points: 5,
            subdivision_batch_size: 1,
            mode: DistanceMode::Marker,
            ..Default::default()
        };

        let fit = scaling_exponent(
            &protein,
            &opts,
            None,
            &mut rng,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!((fit.nu - 1.0).abs() < 1e-9, "nu was {}", fit.nu);
    }

    #[test]
    fn too_few_frames_collapse_bounds_to_nan() {
        let trajectory = straight_chain(30, 3.8, 1);
        let protein = Protein::new(&trajectory).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let opts = ScalingFitOptions {
            inter_residue_min: 2,
            end_effect: 2,
            num_fitting_points: 5,
            subdivision_batch_size: 20,
            mode: DistanceMode::Marker,
            ..Default::default()
        };

        let fit = scaling_exponent(
            &protein,
            &opts,
            None,
            &mut rng,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(fit.nu_bounds.0.is_nan());
        assert!(fit.a0_bounds.1.is_nan());
        assert!((fit.nu - 1.0).abs() < 1e-9);
    }

    #[test]
    fn weights_demand_stride_one() {
        let trajectory = straight_chain(20, 3.8, 4);
        let protein = Protein::new(&trajectory).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let opts = ScalingFitOptions {
            stride: 2,
            ..Default::default()
        };

        let result = scaling_exponent(
            &protein,
            &opts,
            Some(&[0.25; 4]),
            &mut rng,
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(AnalysisError::WeightedStrideUnsupported { stride: 2 })
        ));
    }
}
