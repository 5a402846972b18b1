use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The Polymetry Developers",
    version,
    about = "Polymetry CLI - A command-line interface for polymer-physics analysis of protein conformational ensembles.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full ensemble analysis over a trajectory and export CSV results.
    Analyze(AnalyzeArgs),
    /// Print the residue table and metadata of a trajectory without analyzing it.
    Info(InfoArgs),
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to the input trajectory in multi-model PDB format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory the CSV artifacts are written into (created if missing).
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to the analysis configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to a CSV file with one statistical weight per frame.
    #[arg(short, long, value_name = "PATH")]
    pub weights: Option<PathBuf>,

    /// Override the frame stride of every analysis from the config file.
    #[arg(short, long, value_name = "INT")]
    pub stride: Option<usize>,

    /// Override the logical-to-true residue index offset from the config file.
    #[arg(long, value_name = "INT")]
    pub offset: Option<usize>,

    /// Report root-mean-square distances in the distance map, overriding the config file.
    #[arg(long)]
    pub rms: bool,
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to the input trajectory in multi-model PDB format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Logical-to-true residue index offset applied to the index column.
    #[arg(long, value_name = "INT")]
    pub offset: Option<usize>,
}
