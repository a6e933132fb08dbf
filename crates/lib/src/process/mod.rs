//! Sandboxed process execution.
//!
//! A [`Process`] describes one hermetic invocation: argv, an input image,
//! environment and the paths to capture afterwards. A [`ProcessExecutor`]
//! runs it and returns a [`FallibleProcessResult`]; a non-zero exit is a
//! result, not an error.

mod local;

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::Level;

use crate::image::{Digest, ImageError};

pub use local::LocalProcessExecutor;

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("process has an empty argv: {0}")]
  EmptyArgv(String),

  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to prepare sandbox: {0}")]
  Sandbox(#[source] std::io::Error),

  #[error("process executor is shut down")]
  Closed,

  #[error("process task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error(transparent)]
  Image(#[from] ImageError),
}

/// A single process invocation.
#[derive(Debug, Clone)]
pub struct Process {
  pub argv: Vec<String>,
  /// Image materialized as the working directory.
  pub input_digest: Digest,
  pub env: BTreeMap<String, String>,
  /// Directories captured into the output image.
  pub output_directories: Vec<String>,
  /// Individual files captured into the output image.
  pub output_files: Vec<String>,
  /// Cache name to sandbox-relative path. Contents persist across runs.
  pub append_only_caches: BTreeMap<String, String>,
  /// Run in a warm daemon keyed by this digest.
  pub use_daemon: Option<Digest>,
  pub description: String,
  /// Level at which the process start is logged.
  pub level: Level,
}

impl Process {
  pub fn new(argv: Vec<String>, description: impl Into<String>) -> Self {
    Self {
      argv,
      input_digest: Digest::empty(),
      env: BTreeMap::new(),
      output_directories: Vec::new(),
      output_files: Vec::new(),
      append_only_caches: BTreeMap::new(),
      use_daemon: None,
      description: description.into(),
      level: Level::INFO,
    }
  }
}

/// Outcome of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallibleProcessResult {
  /// Exit code, or -1 when the process was killed by a signal.
  pub exit_code: i32,
  pub stdout: Vec<u8>,
  pub stderr: Vec<u8>,
  pub output_digest: Digest,
}

impl FallibleProcessResult {
  pub fn is_success(&self) -> bool {
    self.exit_code == 0
  }
}

pub trait ProcessExecutor: Send + Sync {
  fn execute<'a>(&'a self, process: &'a Process) -> BoxFuture<'a, Result<FallibleProcessResult, ProcessError>>;
}

/// Emit the start of a process at its configured level.
pub(crate) fn log_start(process: &Process) {
  let description = process.description.as_str();
  match process.level {
    Level::ERROR => tracing::error!(description, "running process"),
    Level::WARN => tracing::warn!(description, "running process"),
    Level::INFO => tracing::info!(description, "running process"),
    Level::DEBUG => tracing::debug!(description, "running process"),
    _ => tracing::trace!(description, "running process"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_process_has_no_inputs_or_outputs() {
    let process = Process::new(vec!["javac".to_string()], "Compile src/a:a with javac");
    assert!(process.input_digest.is_empty());
    assert!(process.output_directories.is_empty());
    assert!(process.use_daemon.is_none());
    assert_eq!(process.level, Level::INFO);
  }

  #[test]
  fn only_zero_exit_is_success() {
    let result = |exit_code| FallibleProcessResult {
      exit_code,
      stdout: Vec::new(),
      stderr: Vec::new(),
      output_digest: Digest::empty(),
    };
    assert!(result(0).is_success());
    assert!(!result(1).is_success());
    assert!(!result(-1).is_success());
  }
}
