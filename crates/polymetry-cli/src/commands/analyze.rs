use crate::cli::AnalyzeArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use nalgebra::DMatrix;
use polymetry::{
    core::{
        io::{
            export::{self, ExportError},
            pdb::PdbFile,
            traits::TrajectoryFile,
            weights,
        },
        models::{ids::ResidueId, trajectory::Trajectory},
    },
    engine::{progress::ProgressReporter, scaling::FitFallback},
    workflows::{self, analyze::EnsembleReport},
};
use std::path::Path;
use tracing::info;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let config = config::resolve_config(&args)?;

    info!("Loading trajectory from {:?}", &args.input);
    let (trajectory, metadata) =
        PdbFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;
    info!(
        "Loaded {} frames of {} atoms.",
        trajectory.n_frames(),
        trajectory.topology().num_atoms()
    );
    if let Some(title) = &metadata.title {
        info!("Trajectory title: {}", title);
    }

    let frame_weights = match &args.weights {
        Some(path) => {
            info!("Loading frame weights from {:?}", path);
            Some(
                weights::load_weights(path).map_err(|e| CliError::FileParsing {
                    path: path.clone(),
                    source: e.into(),
                })?,
            )
        }
        None => None,
    };

    std::fs::create_dir_all(&args.output)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut rng = rand::thread_rng();

    println!("Starting ensemble analysis...");
    info!("Invoking the core ensemble workflow...");

    let report = workflows::analyze::run(
        &trajectory,
        &config,
        frame_weights.as_deref(),
        &mut rng,
        &reporter,
    )?;

    print_fit_summary(&report);

    println!("Writing CSV artifacts...");
    write_artifacts(&args.output, &report, &trajectory)?;
    println!("✓ Results written to: {}", args.output.display());

    Ok(())
}

fn print_fit_summary(report: &EnsembleReport) {
    let meta = &report.metadata;
    let fit = &report.scaling_fit;

    println!();
    println!(
        "Scaling fit over {} residues x {} frames",
        meta.num_residues, meta.n_frames
    );
    println!(
        "  nu                 = {:>8.4}  [{:.4}, {:.4}]",
        fit.nu, fit.nu_bounds.0, fit.nu_bounds.1
    );
    println!(
        "  A0                 = {:>8.4}  [{:.4}, {:.4}] Å",
        fit.a0, fit.a0_bounds.0, fit.a0_bounds.1
    );
    println!("  reduced chi (fit)  = {:>8.4}", fit.reduced_chi_fit);
    println!("  reduced chi (full) = {:>8.4}", fit.reduced_chi_full);
    println!("  fitted points      = {:>8}", fit.fitted_points.len());
    if let FitFallback::FractionOfAvailable { requested, used } = &fit.fallback {
        println!("  note: fell back to {used} of the {requested} requested fitting points");
    }
    println!();
}

/// Labels matrix axes as `NAME-number`; ids missing from the topology label
/// themselves.
fn residue_labels(trajectory: &Trajectory, residues: &[ResidueId]) -> Vec<String> {
    residues
        .iter()
        .map(|&id| {
            trajectory
                .topology()
                .residue(id)
                .map(|residue| residue.label())
                .unwrap_or_else(|| format!("residue {id}"))
        })
        .collect()
}

fn export_error(e: ExportError) -> CliError {
    CliError::Io(std::io::Error::other(e))
}

fn write_artifacts(output: &Path, report: &EnsembleReport, trajectory: &Trajectory) -> Result<()> {
    let map_labels = residue_labels(trajectory, &report.distance_map.residues);
    export::write_matrix_csv(
        &output.join("distance_map_mean.csv"),
        &report.distance_map.mean,
        &map_labels,
    )
    .map_err(export_error)?;
    if let Some(std) = &report.distance_map.std {
        export::write_matrix_csv(&output.join("distance_map_std.csv"), std, &map_labels)
            .map_err(export_error)?;
    }

    let scaling = &report.internal_scaling;
    let separations: Vec<f64> = scaling.separations().iter().map(|&s| s as f64).collect();
    export::write_columns_csv(
        &output.join("internal_scaling.csv"),
        &[
            ("separation", separations),
            ("mean", scaling.means()),
            ("rms", scaling.rms()),
        ],
    )
    .map_err(export_error)?;

    let fit = &report.scaling_fit;
    export::write_columns_csv(
        &output.join("scaling_fit_points.csv"),
        &[
            (
                "separation",
                fit.fitted_points.iter().map(|&(s, _)| s as f64).collect(),
            ),
            ("rms", fit.fitted_points.iter().map(|&(_, r)| r).collect()),
        ],
    )
    .map_err(export_error)?;
    export::write_columns_csv(
        &output.join("scaling_fit_curve.csv"),
        &[
            (
                "separation",
                fit.curve.iter().map(|p| p.separation as f64).collect(),
            ),
            ("rms", fit.curve.iter().map(|p| p.rms).collect()),
            ("model", fit.curve.iter().map(|p| p.model).collect()),
        ],
    )
    .map_err(export_error)?;
    export::write_columns_csv(
        &output.join("scaling_fit_summary.csv"),
        &[
            ("nu", vec![fit.nu]),
            ("nu_min", vec![fit.nu_bounds.0]),
            ("nu_max", vec![fit.nu_bounds.1]),
            ("a0", vec![fit.a0]),
            ("a0_min", vec![fit.a0_bounds.0]),
            ("a0_max", vec![fit.a0_bounds.1]),
            ("reduced_chi_fit", vec![fit.reduced_chi_fit]),
            ("reduced_chi_full", vec![fit.reduced_chi_full]),
        ],
    )
    .map_err(export_error)?;

    let contacts = &report.contact_map;
    let contact_labels = residue_labels(trajectory, &contacts.residues);
    // Cells the scheme could not evaluate export as empty, not as zero.
    let masked = DMatrix::from_fn(
        contacts.fractions.nrows(),
        contacts.fractions.ncols(),
        |i, j| {
            if contacts.computed[(i, j)] {
                contacts.fractions[(i, j)]
            } else {
                f64::NAN
            }
        },
    );
    export::write_matrix_csv(&output.join("contact_map.csv"), &masked, &contact_labels)
        .map_err(export_error)?;
    export::write_columns_csv(
        &output.join("contact_order.csv"),
        &[
            (
                "residue",
                (0..contacts.contact_order.len()).map(|i| i as f64).collect(),
            ),
            ("contact_order", contacts.contact_order.clone()),
        ],
    )
    .map_err(export_error)?;

    export::write_columns_csv(
        &output.join("per_frame.csv"),
        &[
            ("radius_of_gyration", report.radius_of_gyration.clone()),
            ("end_to_end", report.end_to_end.clone()),
            ("asphericity", report.asphericity.clone()),
            ("hydrodynamic_radius", report.hydrodynamic_radius.clone()),
        ],
    )
    .map_err(export_error)?;
    export::write_series_csv(
        &output.join("native_contacts_q.csv"),
        "q",
        &report.native_contacts.q,
    )
    .map_err(export_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn atom_line(serial: usize, residue: usize, coords: (f64, f64, f64)) -> String {
        format!(
            "ATOM  {serial:>5} {name:<4} {res_name:<3} {chain}{res_seq:>4}    {x:>8.3}{y:>8.3}{z:>8.3}{occ:>6.2}{temp:>6.2}          {element:>2}",
            serial = serial,
            name = "CA",
            res_name = "GLY",
            chain = 'A',
            res_seq = residue + 1,
            x = coords.0,
            y = coords.1,
            z = coords.2,
            occ = 1.0,
            temp = 0.0,
            element = "C",
        )
    }

    /// A zig-zag marker chain, rigidly shifted per frame so distances stay
    /// deterministic.
    fn coil_pdb(n_residues: usize, n_frames: usize) -> String {
        let mut lines = vec!["TITLE     SYNTHETIC COIL".to_string()];
        for frame in 0..n_frames {
            lines.push(format!("MODEL     {:>4}", frame + 1));
            for residue in 0..n_residues {
                let x = residue as f64 * 1.9;
                let y = if residue % 2 == 0 { 0.0 } else { 0.8 };
                let z = frame as f64 * 0.05;
                lines.push(atom_line(residue + 1, residue, (x, y, z)));
            }
            lines.push("ENDMDL".to_string());
        }
        lines.push("END".to_string());
        lines.join("\n")
    }

    fn write_coil(dir: &Path, n_residues: usize, n_frames: usize) -> PathBuf {
        let path = dir.join("coil.pdb");
        fs::write(&path, coil_pdb(n_residues, n_frames)).unwrap();
        path
    }

    fn analyze_args(input: PathBuf, output: PathBuf) -> AnalyzeArgs {
        AnalyzeArgs {
            input,
            output,
            config: None,
            weights: None,
            stride: None,
            offset: None,
            rms: false,
        }
    }

    #[test]
    fn full_run_writes_every_artifact() {
        let dir = tempdir().unwrap();
        let input = write_coil(dir.path(), 30, 3);
        let output = dir.path().join("results");

        run(analyze_args(input, output.clone())).unwrap();

        for name in [
            "distance_map_mean.csv",
            "distance_map_std.csv",
            "internal_scaling.csv",
            "scaling_fit_points.csv",
            "scaling_fit_curve.csv",
            "scaling_fit_summary.csv",
            "contact_map.csv",
            "contact_order.csv",
            "per_frame.csv",
            "native_contacts_q.csv",
        ] {
            assert!(output.join(name).exists(), "missing artifact {name}");
        }

        let mean = fs::read_to_string(output.join("distance_map_mean.csv")).unwrap();
        let lines: Vec<&str> = mean.lines().collect();
        assert_eq!(lines.len(), 31);
        assert!(lines[0].starts_with(",GLY-1,GLY-2"));

        let per_frame = fs::read_to_string(output.join("per_frame.csv")).unwrap();
        assert_eq!(per_frame.lines().count(), 4);
        assert_eq!(
            per_frame.lines().next().unwrap(),
            "radius_of_gyration,end_to_end,asphericity,hydrodynamic_radius"
        );

        // Sequence neighbors are never contact candidates and export empty.
        let contacts = fs::read_to_string(output.join("contact_map.csv")).unwrap();
        let first_row = contacts.lines().nth(1).unwrap();
        let cells: Vec<&str> = first_row.split(',').collect();
        assert_eq!(cells[0], "GLY-1");
        assert_eq!(cells[1], "");
        assert_eq!(cells[2], "");
    }

    #[test]
    fn weighted_run_omits_the_std_matrix() {
        let dir = tempdir().unwrap();
        let input = write_coil(dir.path(), 30, 3);
        let output = dir.path().join("weighted");
        let weights_path = dir.path().join("weights.csv");
        fs::write(&weights_path, "0.5\n0.25\n0.25\n").unwrap();

        let mut args = analyze_args(input, output.clone());
        args.weights = Some(weights_path);
        run(args).unwrap();

        assert!(output.join("distance_map_mean.csv").exists());
        assert!(!output.join("distance_map_std.csv").exists());
    }

    #[test]
    fn unreadable_trajectory_reports_the_path() {
        let dir = tempdir().unwrap();
        let args = analyze_args(
            dir.path().join("missing.pdb"),
            dir.path().join("results"),
        );

        let result = run(args);
        match result {
            Err(CliError::FileParsing { path, .. }) => {
                assert!(path.ends_with("missing.pdb"));
            }
            other => panic!("Expected a file parsing error, got {:?}", other.err()),
        }
    }

    #[test]
    fn mismatched_weights_fail_before_artifacts_are_written() {
        let dir = tempdir().unwrap();
        let input = write_coil(dir.path(), 30, 3);
        let output = dir.path().join("results");
        let weights_path = dir.path().join("weights.csv");
        fs::write(&weights_path, "1.0\n1.0\n").unwrap();

        let mut args = analyze_args(input, output.clone());
        args.weights = Some(weights_path);
        let result = run(args);

        assert!(matches!(result, Err(CliError::Analysis(_))));
        assert!(!output.join("distance_map_mean.csv").exists());
    }
}
