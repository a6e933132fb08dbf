//! JDK toolchain setup.
//!
//! The JDK itself lives outside the sandbox. Compilations reach it through a
//! small wrapper script stored in an image, so the process input stays
//! content-addressed while `JAVA_HOME` points at the host installation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::KilnConfig;
use crate::consts::{CLASSPATH_SEPARATOR, JDK_WRAPPER_PATH};
use crate::image::{Digest, FileContent, Image, ImageError, ImageStore};

/// Name of the append-only cache shared by JVM processes.
pub const JVM_CACHE_NAME: &str = "jvm";

/// Sandbox path the JVM cache is linked at.
pub const JVM_CACHE_PATH: &str = "__cache/jvm";

#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("no JDK configured: set KILN_JAVA_HOME or JAVA_HOME")]
  JavaHomeNotSet,

  #[error("JAVA_HOME {0} does not exist")]
  JavaHomeMissing(PathBuf),

  #[error(transparent)]
  Image(#[from] ImageError),
}

/// Everything a process needs to run the JDK.
#[derive(Debug, Clone)]
pub struct JdkSetup {
  pub java_home: PathBuf,
  /// Image holding the wrapper script.
  pub digest: Digest,
  pub env: BTreeMap<String, String>,
  /// Cache name to sandbox-relative path.
  pub append_only_caches: BTreeMap<String, String>,
  pub use_daemon: bool,
  shell: String,
}

impl JdkSetup {
  pub fn new(store: &ImageStore, java_home: &Path, use_daemon: bool, shell: &str) -> Result<Self, ToolchainError> {
    let mut image = Image::new();
    image.insert_file(JDK_WRAPPER_PATH, FileContent::executable(wrapper_script().into_bytes()))?;
    let digest = store.put(image);

    let mut env = BTreeMap::new();
    env.insert("JAVA_HOME".to_string(), java_home.display().to_string());

    let mut append_only_caches = BTreeMap::new();
    append_only_caches.insert(JVM_CACHE_NAME.to_string(), JVM_CACHE_PATH.to_string());

    debug!(java_home = ?java_home, use_daemon, "jdk setup ready");
    Ok(Self {
      java_home: java_home.to_path_buf(),
      digest,
      env,
      append_only_caches,
      use_daemon,
      shell: shell.to_string(),
    })
  }

  /// Build the setup described by `config`.
  pub fn from_config(store: &ImageStore, config: &KilnConfig) -> Result<Self, ToolchainError> {
    let java_home = config.java_home.as_deref().ok_or(ToolchainError::JavaHomeNotSet)?;
    if !java_home.is_dir() {
      return Err(ToolchainError::JavaHomeMissing(java_home.to_path_buf()));
    }
    Self::new(store, java_home, config.use_daemon, &config.shell)
  }

  /// Invocation prefix for running a JVM main class.
  ///
  /// `tool_classpath` is the classpath of the tool itself, not of the code it
  /// operates on; the `-cp` flag is left out when it is empty.
  pub fn args(&self, tool_classpath: &[String]) -> Vec<String> {
    let mut args = vec![self.shell.clone(), JDK_WRAPPER_PATH.to_string()];
    if !tool_classpath.is_empty() {
      args.push("-cp".to_string());
      args.push(tool_classpath.join(CLASSPATH_SEPARATOR));
    }
    args
  }

  /// Digest identifying the warm compiler daemon, when one is requested.
  pub fn daemon_digest(&self) -> Option<Digest> {
    self.use_daemon.then(|| self.digest.clone())
  }
}

fn wrapper_script() -> String {
  "#!/bin/sh\nexec \"$JAVA_HOME/bin/java\" \"$@\"\n".to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn wrapper_is_stored_as_executable() {
    let store = ImageStore::new();
    let jdk = JdkSetup::new(&store, Path::new("/opt/jdk"), false, "/bin/sh").unwrap();

    let image = store.get(&jdk.digest).unwrap();
    let wrapper = image.file(JDK_WRAPPER_PATH).unwrap();
    assert!(wrapper.is_executable);
    assert!(String::from_utf8_lossy(&wrapper.bytes).contains("$JAVA_HOME/bin/java"));
    assert_eq!(jdk.env.get("JAVA_HOME").map(String::as_str), Some("/opt/jdk"));
  }

  #[test]
  fn args_omit_empty_tool_classpath() {
    let store = ImageStore::new();
    let jdk = JdkSetup::new(&store, Path::new("/opt/jdk"), false, "/bin/sh").unwrap();

    assert_eq!(jdk.args(&[]), vec!["/bin/sh", JDK_WRAPPER_PATH]);
    assert_eq!(
      jdk.args(&["a.jar".to_string(), "b.jar".to_string()]),
      vec!["/bin/sh", JDK_WRAPPER_PATH, "-cp", "a.jar:b.jar"]
    );
  }

  #[test]
  fn daemon_digest_follows_flag() {
    let store = ImageStore::new();
    let cold = JdkSetup::new(&store, Path::new("/opt/jdk"), false, "/bin/sh").unwrap();
    let warm = JdkSetup::new(&store, Path::new("/opt/jdk"), true, "/bin/sh").unwrap();
    assert!(cold.daemon_digest().is_none());
    assert_eq!(warm.daemon_digest(), Some(warm.digest.clone()));
  }

  #[test]
  fn from_config_requires_java_home() {
    let store = ImageStore::new();
    let config = KilnConfig {
      java_home: None,
      ..KilnConfig::default()
    };
    assert!(matches!(
      JdkSetup::from_config(&store, &config),
      Err(ToolchainError::JavaHomeNotSet)
    ));

    let temp = TempDir::new().unwrap();
    let config = KilnConfig {
      java_home: Some(temp.path().join("missing")),
      ..KilnConfig::default()
    };
    assert!(matches!(
      JdkSetup::from_config(&store, &config),
      Err(ToolchainError::JavaHomeMissing(_))
    ));

    let config = KilnConfig {
      java_home: Some(temp.path().to_path_buf()),
      ..KilnConfig::default()
    };
    assert!(JdkSetup::from_config(&store, &config).is_ok());
  }
}
