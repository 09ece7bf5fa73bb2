//! Configuration for instrec-backup
//!
//! The TOML file extends the shared [`TomlConfig`] with portal, WebDriver,
//! Drive and mirror sections. Every value resolves as command line, then
//! environment, then TOML, then compiled default. Portal credentials are only
//! ever read from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use instrec_common::config::{
    LoggingConfig, RootFolderResolver, TomlConfig, CONFIG_DIR_NAME, DEFAULT_MIRROR_FOLDER_NAME,
};

use crate::remote::DriveConfig;
use crate::services::mirror_reconciler::ReconcileMode;
use crate::services::record_discovery::PortalLayout;
use crate::services::run_orchestrator::DEFAULT_FAILURE_PAUSE;
use crate::services::session_gatekeeper::GatekeeperConfig;
use crate::session::WebDriverConfig;

pub const USERNAME_ENV: &str = "ENROLLWARE_USERNAME";
pub const PASSWORD_ENV: &str = "ENROLLWARE_PASSWORD";
pub const WEBDRIVER_URL_ENV: &str = "INSTREC_WEBDRIVER_URL";
pub const MIRROR_MODE_ENV: &str = "INSTREC_MIRROR_MODE";
pub const DRIVE_TOKEN_ENV: &str = "INSTREC_DRIVE_TOKEN";

/// Portal login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read both credential variables; `None` if either is unset or blank
    pub fn from_env() -> Option<Self> {
        let username = std::env::var(USERNAME_ENV).ok()?;
        let password = std::env::var(PASSWORD_ENV).ok()?;
        Some(Self::new(username, password)).filter(Credentials::is_complete)
    }

    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `[portal]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalSection {
    pub login_url: Option<String>,
    pub listing_url: Option<String>,
    pub authenticated_marker: Option<String>,
    pub max_retries: Option<u32>,
    pub login_backoff_secs: Option<u64>,
    pub navigation_backoff_secs: Option<u64>,
    pub redirect_timeout_secs: Option<u64>,
    pub failure_pause_secs: Option<u64>,
}

/// `[webdriver]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebDriverSection {
    pub url: Option<String>,
    pub headless: Option<bool>,
}

/// `[drive]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveSection {
    pub token_file: Option<PathBuf>,
    pub api_base: Option<String>,
    pub upload_base: Option<String>,
}

/// `[mirror]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirrorSection {
    pub mode: Option<ReconcileMode>,
}

/// Whole config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub common: TomlConfig,

    /// Remote folder holding one folder per owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_root_folder: Option<String>,

    #[serde(default)]
    pub portal: PortalSection,
    #[serde(default)]
    pub webdriver: WebDriverSection,
    #[serde(default)]
    pub drive: DriveSection,
    #[serde(default)]
    pub mirror: MirrorSection,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub webdriver_url: Option<String>,
    pub mode: Option<ReconcileMode>,
    pub max_retries: Option<u32>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub local_root: PathBuf,
    pub remote_root_folder: String,
    pub mode: ReconcileMode,
    pub failure_pause: Duration,
    pub gatekeeper: GatekeeperConfig,
    pub layout: PortalLayout,
    pub webdriver: WebDriverConfig,
    pub drive: DriveConfig,
    pub logging: LoggingConfig,
}

impl BackupConfig {
    pub fn resolve(file: &ConfigFile, cli: &CliOverrides) -> Self {
        let local_root = RootFolderResolver::new("instrec-backup")
            .with_cli_arg(cli.root_folder.clone())
            .with_toml(&file.common)
            .resolve();

        let mode = cli
            .mode
            .or_else(|| env_value(MIRROR_MODE_ENV).and_then(|v| parse_mode(&v)))
            .or(file.mirror.mode)
            .unwrap_or_default();

        let mut gatekeeper = GatekeeperConfig::default();
        let portal = &file.portal;
        if let Some(url) = &portal.login_url {
            gatekeeper.login_url = url.clone();
        }
        if let Some(url) = &portal.listing_url {
            gatekeeper.listing_url = url.clone();
        }
        if let Some(marker) = &portal.authenticated_marker {
            gatekeeper.authenticated_marker = marker.clone();
        }
        if let Some(retries) = cli.max_retries.or(portal.max_retries) {
            gatekeeper.max_retries = retries;
        }
        if let Some(secs) = portal.login_backoff_secs {
            gatekeeper.login_backoff = Duration::from_secs(secs);
        }
        if let Some(secs) = portal.navigation_backoff_secs {
            gatekeeper.navigation_backoff = Duration::from_secs(secs);
        }
        if let Some(secs) = portal.redirect_timeout_secs {
            gatekeeper.redirect_timeout = Duration::from_secs(secs);
        }

        let mut webdriver = WebDriverConfig::default();
        if let Some(url) = cli
            .webdriver_url
            .clone()
            .or_else(|| env_value(WEBDRIVER_URL_ENV))
            .or_else(|| file.webdriver.url.clone())
        {
            webdriver.server_url = url;
        }
        if let Some(headless) = file.webdriver.headless {
            webdriver.headless = headless;
        }

        let mut drive = DriveConfig {
            token_file: default_token_file(),
            ..DriveConfig::default()
        };
        if let Some(path) = env_value(DRIVE_TOKEN_ENV)
            .map(PathBuf::from)
            .or_else(|| file.drive.token_file.clone())
        {
            drive.token_file = path;
        }
        if let Some(base) = &file.drive.api_base {
            drive.api_base = base.clone();
        }
        if let Some(base) = &file.drive.upload_base {
            drive.upload_base = base.clone();
        }

        Self {
            local_root,
            remote_root_folder: file
                .remote_root_folder
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MIRROR_FOLDER_NAME.to_string()),
            mode,
            failure_pause: portal
                .failure_pause_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_FAILURE_PAUSE),
            gatekeeper,
            layout: PortalLayout::default(),
            webdriver,
            drive,
            logging: file.common.logging.clone(),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_mode(value: &str) -> Option<ReconcileMode> {
    match ReconcileMode::from_str(value.trim(), true) {
        Ok(mode) => Some(mode),
        Err(_) => {
            tracing::warn!(value = %value, "Ignoring unknown {} value", MIRROR_MODE_ENV);
            None
        }
    }
}

/// `<config dir>/instrec/token.json`, or `token.json` in the working directory
pub fn default_token_file() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR_NAME).join("token.json"))
        .unwrap_or_else(|| PathBuf::from("token.json"))
}
