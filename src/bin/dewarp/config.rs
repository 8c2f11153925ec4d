//! Assembles the run configuration from the parameter file and the command line.

use crate::Cli;
use oar_dewarp::core::{DewarpConfig, DewarpError, DewarpResult, OperationLevel};
use oar_dewarp::processors::ResizePolicy;

/// Parameter file first, then command-line overrides.
pub fn resolve_config(cli: &Cli) -> DewarpResult<DewarpConfig> {
    let mut config = match (&cli.parameter, &cli.model_path) {
        (Some(path), _) => DewarpConfig::from_json_file(path)?,
        (None, Some(model_path)) => DewarpConfig::new(model_path),
        (None, None) => {
            return Err(DewarpError::ConfigError {
                message: "either --parameter or --model-path is required".to_string(),
            });
        }
    };

    if let Some(model_path) = &cli.model_path {
        config.model_path = model_path.clone();
    }
    if let Some(gpu_id) = cli.gpu_id {
        config.gpu_id = gpu_id;
    }
    if let Some(level) = &cli.operation_level {
        config.operation_level = level.parse::<OperationLevel>()?;
    }
    if let Some(policy) = &cli.resize_or_crop {
        config.resize_or_crop = policy.parse::<ResizePolicy>()?;
    }
    if let Some(height) = cli.target_height {
        config.target_height = height;
    }
    if let Some(width) = cli.target_width {
        config.target_width = width;
    }
    config.force |= cli.force;

    Ok(config)
}
