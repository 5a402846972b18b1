use crate::cli::InfoArgs;
use crate::error::{CliError, Result};
use polymetry::{
    core::{
        io::{pdb::PdbFile, traits::TrajectoryFile},
        models::ids::ResidueId,
    },
    engine::protein::Protein,
};
use std::path::Path;
use tracing::info;

pub fn run(args: InfoArgs) -> Result<()> {
    info!("Loading trajectory from {:?}", &args.input);
    let (trajectory, metadata) =
        PdbFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;

    let protein = Protein::with_offset(&trajectory, args.offset.unwrap_or(0))?;

    for line in summary_lines(&protein, metadata.title.as_deref(), &args.input) {
        println!("{}", line);
    }
    Ok(())
}

/// The printable handle summary: header block, one-letter sequence, and the
/// per-residue table with logical index, true id, label, and marker state.
fn summary_lines(protein: &Protein<'_>, title: Option<&str>, input: &Path) -> Vec<String> {
    let topology = protein.trajectory().topology();
    let mut lines = Vec::new();

    lines.push(format!("Trajectory: {}", input.display()));
    if let Some(title) = title {
        lines.push(format!("Title:      {}", title));
    }
    lines.push(format!(
        "Frames:     {} ({} atoms per frame)",
        protein.n_frames(),
        topology.num_atoms()
    ));
    lines.push(format!(
        "Residues:   {} (N-cap: {}, C-cap: {})",
        protein.num_residues(),
        yes_no(protein.ncap()),
        yes_no(protein.ccap()),
    ));
    if protein.residue_offset() > 0 {
        lines.push(format!("Offset:     {}", protein.residue_offset()));
    }
    lines.push(format!("Sequence:   {}", protein.sequence()));

    lines.push(String::new());
    lines.push(format!(
        "{:>6} {:>6}  {:<12} {:>6}",
        "index", "id", "residue", "marker"
    ));
    for position in 0..protein.num_residues() {
        let residue = ResidueId(position);
        // Logical indices only reach residues at or past the offset.
        let index = position
            .checked_sub(protein.residue_offset())
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "{:>6} {:>6}  {:<12} {:>6}",
            index,
            position,
            protein.residue_label(residue),
            yes_no(protein.has_marker(residue)),
        ));
    }

    lines
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
