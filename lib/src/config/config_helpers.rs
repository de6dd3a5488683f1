// lib/src/config/config_helpers.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use serde_yaml2 as serde_yaml;

pub use crate::config::config_constants::*;
pub use crate::config::config_structs::*;

/// Loads the clinic configuration, falling back to defaults when the file is absent.
pub fn load_clinic_config(config_file_path: Option<&Path>) -> Result<ClinicConfig> {
    let path_to_use = config_file_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CLINIC_CONFIG_PATH_RELATIVE));

    info!("Attempting to load clinic config from {:?}", path_to_use);

    if !path_to_use.exists() {
        warn!("Config file not found at {}. Using default clinic config.", path_to_use.display());
        return Ok(ClinicConfig::default());
    }

    let config_content = fs::read_to_string(&path_to_use)
        .context(format!("Failed to read clinic config file: {}", path_to_use.display()))?;

    let wrapper: ClinicConfigWrapper = serde_yaml::from_str(&config_content).map_err(|e| {
        error!("YAML parsing error for clinic config at {:?}: {:?}", path_to_use, e);
        anyhow!("Failed to parse clinic config YAML: {}", path_to_use.display())
    })?;
    info!("Loaded clinic config: {:?}", wrapper.clinic.server);
    Ok(wrapper.clinic)
}

pub fn save_clinic_config(config: &ClinicConfig, config_path: &Path) -> Result<()> {
    let wrapper = ClinicConfigWrapper {
        config_root_directory: config_path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| DEFAULT_CONFIG_ROOT_DIRECTORY_STR.to_string()),
        clinic: config.clone(),
    };

    let yaml_string = serde_yaml::to_string(&wrapper)
        .map_err(|e| anyhow!("Failed to serialize ClinicConfig to YAML: {:?}", e))?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .context(format!("Failed to create parent directories for {}", config_path.display()))?;
    }

    fs::write(config_path, yaml_string)
        .context(format!("Failed to write ClinicConfig to file: {}", config_path.display()))?;

    Ok(())
}

/// Command line flags win over the file.
pub fn apply_cli_overrides(mut config: ClinicConfig, args: &ClinicCliArgs) -> ClinicConfig {
    if let Some(port) = args.port {
        debug!("Overriding port from command line: {}", port);
        config.server.port = port;
    }
    if let Some(engine) = args.storage {
        debug!("Overriding storage engine from command line: {}", engine);
        config.storage.storage_engine_type = engine;
    }
    if let Some(path) = &args.storage_path {
        config.storage.path = path.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config
}
