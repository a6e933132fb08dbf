//! Runtime configuration.
//!
//! Values start from built-in defaults and are overridden by environment
//! variables. The CLI applies its flags on top of [`KilnConfig::from_env`].

use std::path::PathBuf;

use thiserror::Error;

use crate::consts::APP_NAME;

pub const ENV_PARALLELISM: &str = "KILN_PARALLELISM";
pub const ENV_JAVA_HOME: &str = "KILN_JAVA_HOME";
pub const ENV_USE_DAEMON: &str = "KILN_USE_DAEMON";
pub const ENV_ARTIFACT_REPO: &str = "KILN_ARTIFACT_REPO";
pub const ENV_CACHE_DIR: &str = "KILN_CACHE_DIR";
pub const ENV_SHELL: &str = "KILN_SHELL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("invalid value '{value}' for {var}: {reason}")]
  InvalidValue {
    var: &'static str,
    value: String,
    reason: &'static str,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KilnConfig {
  /// Maximum number of concurrently running processes.
  pub parallelism: usize,
  pub java_home: Option<PathBuf>,
  /// Request a warm compiler daemon for javac invocations.
  pub use_daemon: bool,
  /// Directory of third-party artifacts. Defaults to the build graph's directory.
  pub artifact_repo: Option<PathBuf>,
  /// Root of append-only caches shared between processes.
  pub cache_dir: PathBuf,
  /// Absolute path of the POSIX shell used to start wrappers.
  pub shell: String,
}

impl Default for KilnConfig {
  fn default() -> Self {
    Self {
      parallelism: default_parallelism(),
      java_home: None,
      use_daemon: false,
      artifact_repo: None,
      cache_dir: default_cache_dir(),
      shell: "/bin/sh".to_string(),
    }
  }
}

impl KilnConfig {
  /// Defaults overridden by `KILN_*` variables (and `JAVA_HOME`).
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut config = Self::default();

    if let Some(value) = var(ENV_PARALLELISM) {
      config.parallelism = parse_parallelism(ENV_PARALLELISM, &value)?;
    }
    config.java_home = var(ENV_JAVA_HOME).or_else(|| var("JAVA_HOME")).map(PathBuf::from);
    if let Some(value) = var(ENV_USE_DAEMON) {
      config.use_daemon = parse_bool(ENV_USE_DAEMON, &value)?;
    }
    if let Some(value) = var(ENV_ARTIFACT_REPO) {
      config.artifact_repo = Some(PathBuf::from(value));
    }
    if let Some(value) = var(ENV_CACHE_DIR) {
      config.cache_dir = PathBuf::from(value);
    }
    if let Some(value) = var(ENV_SHELL) {
      if !value.starts_with('/') {
        return Err(ConfigError::InvalidValue {
          var: ENV_SHELL,
          value,
          reason: "must be an absolute path",
        });
      }
      config.shell = value;
    }

    Ok(config)
  }
}

fn var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.is_empty())
}

pub fn parse_parallelism(var: &'static str, value: &str) -> Result<usize, ConfigError> {
  match value.trim().parse::<usize>() {
    Ok(0) => Err(ConfigError::InvalidValue {
      var,
      value: value.to_string(),
      reason: "must be at least 1",
    }),
    Ok(n) => Ok(n),
    Err(_) => Err(ConfigError::InvalidValue {
      var,
      value: value.to_string(),
      reason: "expected a positive integer",
    }),
  }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(ConfigError::InvalidValue {
      var,
      value: value.to_string(),
      reason: "expected true or false",
    }),
  }
}

fn default_parallelism() -> usize {
  std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn default_cache_dir() -> PathBuf {
  let cache_home = var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .or_else(|| var("HOME").map(|home| PathBuf::from(home).join(".cache")))
    .unwrap_or_else(std::env::temp_dir);
  cache_home.join(APP_NAME)
}
