//! Result types for component compilation.
//!
//! Compile failures are values: a [`FallibleClasspathEntry`] carries one of
//! the [`CompileResult`] variants and flows upward through dependents.
//! Infrastructure problems (unreadable inputs, broken lockfiles, spawn
//! failures) are [`CompileError`]s instead and abort the request.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::graph::GraphError;
use crate::image::{Digest, ImageError};
use crate::process::{FallibleProcessResult, ProcessError};
use crate::resolve::LockfileError;
use crate::sources::SourceError;

/// Outcome of compiling one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileResult {
  /// The compiler exited zero, or the component was an alias.
  Succeeded,
  /// The compiler exited non-zero.
  Failed,
  /// A dependency did not succeed; the compiler was not run.
  DependencyFailed,
}

impl std::fmt::Display for CompileResult {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      CompileResult::Succeeded => "succeeded",
      CompileResult::Failed => "failed",
      CompileResult::DependencyFailed => "dependency failed",
    };
    f.write_str(name)
  }
}

/// Compiled output of a component: an image holding its jar, or the merged
/// jars of its dependencies for aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClasspathEntry {
  pub digest: Digest,
}

impl ClasspathEntry {
  pub fn new(digest: Digest) -> Self {
    Self { digest }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallibleClasspathEntry {
  /// String form of the component.
  pub description: String,
  pub result: CompileResult,
  /// Present exactly when `result` is `Succeeded`.
  pub output: Option<ClasspathEntry>,
  pub exit_code: i32,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub stdout: String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub stderr: String,
  /// Description of the component whose compile failed first, for
  /// `DependencyFailed` entries.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub root_cause: Option<String>,
}

impl FallibleClasspathEntry {
  pub fn succeeded(description: impl Into<String>, output: ClasspathEntry) -> Self {
    Self {
      description: description.into(),
      result: CompileResult::Succeeded,
      output: Some(output),
      exit_code: 0,
      stdout: String::new(),
      stderr: String::new(),
      root_cause: None,
    }
  }

  /// Short-circuit result for a component whose dependency `cause` did not succeed.
  pub fn dependency_failed(description: impl Into<String>, cause: &FallibleClasspathEntry) -> Self {
    Self {
      description: description.into(),
      result: CompileResult::DependencyFailed,
      output: None,
      exit_code: 1,
      stdout: String::new(),
      stderr: String::new(),
      root_cause: Some(cause.root_cause.clone().unwrap_or_else(|| cause.description.clone())),
    }
  }

  /// Mirror a compiler run. `output` is dropped unless the process exited zero.
  pub fn from_fallible_process_result(
    description: impl Into<String>,
    result: &FallibleProcessResult,
    output: Option<ClasspathEntry>,
  ) -> Self {
    let succeeded = result.is_success();
    Self {
      description: description.into(),
      result: if succeeded {
        CompileResult::Succeeded
      } else {
        CompileResult::Failed
      },
      output: if succeeded { output } else { None },
      exit_code: result.exit_code,
      stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
      root_cause: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.result == CompileResult::Succeeded
  }

  /// Human-readable summary for display.
  pub fn message(&self) -> String {
    match self.result {
      CompileResult::Succeeded => format!("Compiled {}", self.description),
      CompileResult::Failed => {
        let mut message = format!("Compiling {} failed with exit code {}", self.description, self.exit_code);
        for stream in [&self.stdout, &self.stderr] {
          let trimmed = stream.trim();
          if !trimmed.is_empty() {
            message.push('\n');
            message.push_str(trimmed);
          }
        }
        message
      }
      CompileResult::DependencyFailed => match &self.root_cause {
        Some(cause) => format!("{} was not compiled: dependency {} failed", self.description, cause),
        None => format!("{} was not compiled: a dependency failed", self.description),
      },
    }
  }
}

/// Errors that abort a compile request.
#[derive(Debug, Error)]
pub enum CompileError {
  #[error(transparent)]
  Image(#[from] ImageError),

  #[error(transparent)]
  Source(#[from] SourceError),

  #[error(transparent)]
  Lockfile(#[from] LockfileError),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("compile task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  /// An error already reported to another waiter on the same compile.
  #[error(transparent)]
  Shared(Arc<CompileError>),
}

impl CompileError {
  /// The error behind any layers of sharing.
  pub fn inner(&self) -> &CompileError {
    match self {
      CompileError::Shared(inner) => inner.inner(),
      other => other,
    }
  }

  pub(crate) fn into_shared(self) -> Arc<CompileError> {
    match self {
      CompileError::Shared(inner) => inner,
      other => Arc::new(other),
    }
  }
}
