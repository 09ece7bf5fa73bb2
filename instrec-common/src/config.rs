//! Configuration loading and root folder resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: callers get defaults and a warning.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the local mirror root
pub const ROOT_FOLDER_ENV: &str = "INSTREC_ROOT_FOLDER";

/// Directory name used under the platform config dir
pub const CONFIG_DIR_NAME: &str = "instrec";

/// Name of the local mirror folder when nothing else is configured
pub const DEFAULT_MIRROR_FOLDER_NAME: &str = "Instructor records";

/// Settings shared by every instrec tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Local mirror root folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset ("trace" .. "error")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file; stderr when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Values compiled into the binary, used when nothing overrides them
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::document_dir()
            .or_else(dirs::home_dir)
            .map(|d| d.join(DEFAULT_MIRROR_FOLDER_NAME))
            .unwrap_or_else(|| PathBuf::from(".").join(DEFAULT_MIRROR_FOLDER_NAME));

        Self {
            root_folder,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// Resolves the local mirror root folder
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_value: Option<String>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_value: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_value = config.root_folder.clone();
        self
    }

    /// Resolve the root folder; never fails, falls back to the compiled default
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from TOML config");
                return PathBuf::from(path);
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Default config file location: `<config dir>/instrec/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join("config.toml"))
}

/// Load a TOML file into `T`
///
/// A missing file yields `T::default()` with a warning; a malformed file is an error.
pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}
