//! Configuration loading and discovery.
//!
//! Configuration is discovered through a small hierarchy:
//! 1. Current directory: ./rangekeeper.toml
//! 2. User config: ~/.rangekeeper/config.toml
//! 3. System config: /etc/rangekeeper/config.toml
//! 4. Built-in defaults

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::orchestrator::MAX_TIME_ALIVE_SECS;

/// Config file name looked up in the current directory.
pub const LOCAL_CONFIG_FILE_NAME: &str = "rangekeeper.toml";

/// Hidden per-user configuration directory name.
pub const USER_CONFIG_DIR_NAME: &str = ".rangekeeper";

/// File name inside the user and system configuration directories.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// First host port considered for exercise exposure.
pub const DEFAULT_PORT_RANGE_START: u16 = 50000;

/// One past the last host port considered for exercise exposure.
pub const DEFAULT_PORT_RANGE_END: u16 = 60000;

/// Errors raised while loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Runtime configuration for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangekeeperConfig {
    /// Public address or hostname composed into returned service URLs
    pub public_address: String,
    /// First host port of the allocation range
    pub port_range_start: u16,
    /// One past the last host port of the allocation range
    pub port_range_end: u16,
    /// Upper bound on requested container lifetimes, in seconds
    pub max_time_alive_secs: i64,
    /// Container engine CLI binary ("docker" or a compatible CLI like podman)
    pub engine_binary: String,
}

impl Default for RangekeeperConfig {
    fn default() -> Self {
        Self {
            public_address: "0.0.0.0".to_string(),
            port_range_start: DEFAULT_PORT_RANGE_START,
            port_range_end: DEFAULT_PORT_RANGE_END,
            max_time_alive_secs: MAX_TIME_ALIVE_SECS,
            engine_binary: "docker".to_string(),
        }
    }
}

impl RangekeeperConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Configuration discovery system.
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load configuration using the hierarchy.
    pub fn discover() -> Result<RangekeeperConfig, ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return RangekeeperConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(RangekeeperConfig::default())
    }

    /// Find a configuration file using the discovery hierarchy.
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Configuration file candidates in priority order.
    fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join(LOCAL_CONFIG_FILE_NAME));
        }

        if let Some(home_dir) = env::var_os("HOME").map(PathBuf::from) {
            candidates.push(home_dir.join(USER_CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/rangekeeper").join(CONFIG_FILE_NAME));

        candidates
    }

    /// Print configuration discovery information for debugging.
    pub fn show_discovery_info() {
        println!("Configuration discovery hierarchy:");

        for (i, candidate) in Self::config_candidates().iter().enumerate() {
            let status = if candidate.is_file() {
                "EXISTS"
            } else {
                "NOT FOUND"
            };
            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        match Self::find_config_file() {
            Some(found) => println!("Active configuration: {found:?}"),
            None => println!("Active configuration: built-in defaults"),
        }
    }
}
