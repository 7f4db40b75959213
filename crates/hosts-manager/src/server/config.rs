use crate::server::hooks::DEFAULT_HOOK_TIMEOUT_SECS;
use hosts_manager_store::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable overriding the managed hosts file
pub const HOSTS_FILE_ENV: &str = "HOSTS_MANAGER_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("hosts.path must not be empty")]
    MissingHostsPath,

    #[error("hooks.timeout_secs must be greater than zero")]
    InvalidHookTimeout,

    #[error("Config file security: {0}")]
    InsecureConfig(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostsConfig {
    /// Entries file to manage
    pub path: PathBuf,

    /// Treat a missing file as empty instead of failing
    pub create_if_missing: bool,

    /// Validate addresses and hostnames of new and changed entries
    pub validate: bool,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            path: default_hosts_path(),
            create_if_missing: false,
            validate: true,
        }
    }
}

#[cfg(windows)]
fn default_hosts_path() -> PathBuf {
    PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
}

#[cfg(not(windows))]
fn default_hosts_path() -> PathBuf {
    PathBuf::from("/etc/hosts")
}

/// Commands run after a batch is written or fails to be written
///
/// # Security Warning
///
/// Hook commands run through `sh -c` with the privileges of the process that
/// edits the hosts file, which is usually root. The config file must not be
/// writable by other users; world-writable files are rejected on load.
///
/// Context is passed through the environment, never interpolated:
///
/// - `HOSTS_MANAGER_EVENT`: "success" or "failure"
/// - `HOSTS_MANAGER_ENTRY_COUNT`: entries in the file after the write
/// - `HOSTS_MANAGER_ERROR`: error message (failure hooks only)
///
/// ```toml
/// [hooks]
/// on_success = ["systemctl reload dnsmasq"]
/// on_failure = ["/usr/local/bin/alert-failure"]
/// timeout_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    pub on_success: Vec<String>,
    pub on_failure: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            on_success: vec![],
            on_failure: vec![],
            timeout_secs: DEFAULT_HOOK_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hosts: HostsConfig,
    pub hooks: HooksConfig,
}

impl Config {
    /// Load configuration with precedence: CLI > env > file > defaults
    ///
    /// An explicitly given config file must exist. Without one, the default
    /// location is used if present.
    pub fn load(config_path: Option<&Path>, cli_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::from_file(path)?,
            None => {
                let default = default_config_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    debug!(path = %default.display(), "No config file, using defaults");
                    Self::default()
                }
            }
        };

        if let Some(path) = cli_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(HOSTS_FILE_ENV).map(PathBuf::from))
        {
            config.hosts.path = path;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        // The file can carry hook commands
        Self::check_config_permissions(path)?;

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingHostsPath);
        }
        if self.hooks.timeout_secs == 0 {
            return Err(ConfigError::InvalidHookTimeout);
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            create_if_missing: self.hosts.create_if_missing,
        }
    }

    /// Render as TOML, as shown by the `config` command
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject world-writable config files, warn on group-writable ones
    #[cfg(unix)]
    fn check_config_permissions(path: &Path) -> Result<(), ConfigError> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Unable to check config file permissions - ensure file is not world-writable"
                );
                return Ok(());
            }
        };

        let mode = metadata.permissions().mode();

        if mode & 0o002 != 0 {
            return Err(ConfigError::InsecureConfig(format!(
                "Config file '{}' is world-writable (mode {:o}). Fix with: chmod o-w {}",
                path.display(),
                mode,
                path.display()
            )));
        }

        if mode & 0o020 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{:o}", mode),
                "Config file is group-writable - consider restricting with: chmod g-w"
            );
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_config_permissions(_path: &Path) -> Result<(), ConfigError> {
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hosts-manager")
        .join("config.toml")
}
