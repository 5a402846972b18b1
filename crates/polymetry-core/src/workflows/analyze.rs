use rand::Rng;
use tracing::{info, instrument};

use crate::core::models::trajectory::Trajectory;
use crate::engine::config::AnalysisConfig;
use crate::engine::contacts::{self, ContactMap, NativeContacts};
use crate::engine::distances::{self, DistanceMap, DistanceMode, InternalScaling};
use crate::engine::error::AnalysisError;
use crate::engine::polymer;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::protein::Protein;
use crate::engine::scaling::{self, ScalingFit};

/// Handle-level facts about the analyzed ensemble.
#[derive(Debug, Clone)]
pub struct EnsembleMetadata {
    pub num_residues: usize,
    pub n_frames: usize,
    pub ncap: bool,
    pub ccap: bool,
    /// One-letter sequence over the marker-bearing residues.
    pub sequence: String,
}

/// Everything one full analysis pass produces.
#[derive(Debug, Clone)]
pub struct EnsembleReport {
    pub metadata: EnsembleMetadata,
    pub distance_map: DistanceMap,
    pub internal_scaling: InternalScaling,
    pub scaling_fit: ScalingFit,
    pub radius_of_gyration: Vec<f64>,
    pub end_to_end: Vec<f64>,
    pub asphericity: Vec<f64>,
    pub hydrodynamic_radius: Vec<f64>,
    pub contact_map: ContactMap,
    pub native_contacts: NativeContacts,
}

/// Runs the complete ensemble analysis over a loaded trajectory.
///
/// Frame weights, when given, are threaded through every phase; phases that
/// cannot reconcile weights with their stride fail rather than silently
/// ignoring either. The random source drives the reweighting resamples and
/// the bootstrap subdivision shuffle, so a seeded generator makes the whole
/// pass reproducible.
#[instrument(skip_all, name = "ensemble_workflow")]
pub fn run(
    trajectory: &Trajectory,
    config: &AnalysisConfig,
    weights: Option<&[f64]>,
    rng: &mut impl Rng,
    reporter: &ProgressReporter<'_>,
) -> Result<EnsembleReport, AnalysisError> {
    // === Phase 0: Build the protein handle ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!("Validating configuration and building the protein handle.");
    config.validate()?;
    let protein = Protein::with_offset(trajectory, config.residue_offset)?;
    let metadata = EnsembleMetadata {
        num_residues: protein.num_residues(),
        n_frames: protein.n_frames(),
        ncap: protein.ncap(),
        ccap: protein.ccap(),
        sequence: protein.sequence(),
    };
    info!(
        residues = metadata.num_residues,
        frames = metadata.n_frames,
        ncap = metadata.ncap,
        ccap = metadata.ccap,
        "Protein handle ready."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Inter-residue distance map ===
    reporter.report(Progress::PhaseStart {
        name: "Distance Map",
    });
    info!("Computing the inter-residue distance map.");
    let distance_map = distances::distance_map(&protein, &config.distance_map, weights, reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Internal scaling profile ===
    reporter.report(Progress::PhaseStart {
        name: "Internal Scaling",
    });
    info!("Pooling inter-residue distances by sequence separation.");
    let internal_scaling =
        distances::internal_scaling(&protein, &config.internal_scaling, weights, rng, reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Scaling-exponent fit ===
    reporter.report(Progress::PhaseStart {
        name: "Scaling Fit",
    });
    info!("Fitting the apparent scaling exponent.");
    let scaling_fit =
        scaling::scaling_exponent(&protein, &config.scaling_fit, weights, rng, reporter)?;
    info!(
        nu = scaling_fit.nu,
        a0 = scaling_fit.a0,
        "Scaling fit complete."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Per-frame polymer observables ===
    reporter.report(Progress::PhaseStart {
        name: "Polymer Observables",
    });
    info!("Computing per-frame polymer observables.");
    let radius_of_gyration = polymer::radius_of_gyration(&protein, None, None)?;
    let end_to_end = polymer::end_to_end_distance(&protein, DistanceMode::Marker)?;
    let asphericity = polymer::asphericity(&protein)?;
    let hydrodynamic_radius = polymer::hydrodynamic_radius(&protein)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 5: Fractional contact map ===
    reporter.report(Progress::PhaseStart {
        name: "Contact Map",
    });
    info!("Computing the fractional contact map.");
    let contact_map = contacts::contact_map(&protein, &config.contact_map, weights, reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 6: Native contacts ===
    reporter.report(Progress::PhaseStart {
        name: "Native Contacts",
    });
    info!("Computing soft native-contact fractions.");
    let native_contacts = contacts::native_contacts(&protein, &config.native_contacts, weights)?;
    reporter.report(Progress::PhaseFinish);

    info!("Workflow complete.");
    Ok(EnsembleReport {
        metadata,
        distance_map,
        internal_scaling,
        scaling_fit,
        radius_of_gyration,
        end_to_end,
        asphericity,
        hydrodynamic_radius,
        contact_map,
        native_contacts,
    })
}
