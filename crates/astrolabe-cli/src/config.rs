//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory),
//! and applying command-line overrides on top of them.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use astrolabe::{
    AstrolabeError,
    config::{AppConfig, GenerationConfig},
};

use crate::Args;

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),
}

impl From<ConfigError> for AstrolabeError {
    fn from(err: ConfigError) -> Self {
        let kind = match err {
            ConfigError::Parse(_) => io::ErrorKind::InvalidData,
            ConfigError::MissingFile(_) => io::ErrorKind::NotFound,
        };
        AstrolabeError::Io(io::Error::new(kind, err.to_string()))
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (astrolabe/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path to config file
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, AstrolabeError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("astrolabe/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "astrolabe", "astrolabe") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

/// Load configuration from a TOML file
///
/// # Errors
///
/// Returns error if:
/// - File doesn't exist
/// - File cannot be read
/// - TOML parsing fails
fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, AstrolabeError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    Ok(config)
}

/// Applies the generation flags of the command line to a loaded configuration.
///
/// Modules given on the command line replace the configured ones; the
/// naming flag can only switch fully qualified names on.
pub fn apply_overrides(config: AppConfig, args: &Args) -> AppConfig {
    let generation = config.generation();
    let modules = if args.modules.is_empty() {
        generation.modules().to_vec()
    } else {
        args.modules.clone()
    };
    let overridden = GenerationConfig::new(
        modules,
        generation.fully_qualified_names() || args.fully_qualified_names,
        args.target.unwrap_or(generation.target()),
    );
    debug!(
        modules:? = overridden.modules(),
        fully_qualified_names = overridden.fully_qualified_names(),
        backend = overridden.target().as_str();
        "Effective generation settings"
    );
    config.with_generation(overridden)
}
