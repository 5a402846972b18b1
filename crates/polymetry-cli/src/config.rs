use crate::cli::AnalyzeArgs;
use crate::error::{CliError, Result};
use polymetry::engine::config::AnalysisConfig;
use tracing::debug;

/// Loads the analysis configuration and applies CLI overrides.
///
/// Precedence is CLI flag over config file over built-in default. Without
/// `--config`, every value starts from its default. `--stride` overrides the
/// stride of every analysis section at once.
pub fn resolve_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => {
            debug!("Loading analysis configuration from {:?}", path);
            AnalysisConfig::load(path).map_err(|e| CliError::Config(e.to_string()))?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(stride) = args.stride {
        if stride == 0 {
            return Err(CliError::InvalidArgument(
                "--stride must be at least 1".to_string(),
            ));
        }
        config.distance_map.stride = stride;
        config.internal_scaling.stride = stride;
        config.scaling_fit.stride = stride;
        config.contact_map.stride = stride;
        config.native_contacts.stride = stride;
    }
    if let Some(offset) = args.offset {
        config.residue_offset = offset;
    }
    if args.rms {
        config.distance_map.rms = true;
    }

    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}
