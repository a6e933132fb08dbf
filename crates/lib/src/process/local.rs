//! Local sandboxed execution.
//!
//! Each process runs in a fresh temporary directory holding its input image,
//! with an environment built from scratch:
//! - all inherited variables cleared
//! - PATH set to /path-not-set so undeclared tools fail fast
//! - HOME set to /homeless-shelter
//! - TMPDIR/TMP/TEMP/TEMPDIR pointing inside the sandbox
//! - LANG/LC_ALL fixed to C and SOURCE_DATE_EPOCH set
//!
//! The process's own environment is applied last.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::debug;

use super::{FallibleProcessResult, Process, ProcessError, ProcessExecutor, log_start};
use crate::consts::SOURCE_DATE_EPOCH;
use crate::image::{ImageStore, disk};

const SANDBOX_TMP_DIR: &str = "__tmp";

/// Runs processes on this machine, at most `parallelism` at a time.
#[derive(Debug, Clone)]
pub struct LocalProcessExecutor {
  store: ImageStore,
  semaphore: Arc<Semaphore>,
  cache_root: PathBuf,
}

impl LocalProcessExecutor {
  pub fn new(store: ImageStore, parallelism: usize, cache_root: impl Into<PathBuf>) -> Self {
    Self {
      store,
      semaphore: Arc::new(Semaphore::new(parallelism.max(1))),
      cache_root: cache_root.into(),
    }
  }

  async fn run(&self, process: &Process) -> Result<FallibleProcessResult, ProcessError> {
    let (program, args) = process
      .argv
      .split_first()
      .ok_or_else(|| ProcessError::EmptyArgv(process.description.clone()))?;

    let _permit = self.semaphore.acquire().await.map_err(|_| ProcessError::Closed)?;
    log_start(process);

    let sandbox = tempfile::Builder::new()
      .prefix("kiln-sandbox-")
      .tempdir()
      .map_err(ProcessError::Sandbox)?;
    let root = sandbox.path().to_path_buf();
    self.prepare_sandbox(process, &root).await?;

    if process.use_daemon.is_some() {
      debug!(description = %process.description, "daemon requested, running cold process");
    }

    let tmp_dir = root.join(SANDBOX_TMP_DIR);
    let mut command = Command::new(program);
    command
      .args(args)
      .current_dir(&root)
      .env_clear()
      .env("PATH", "/path-not-set")
      .env("HOME", "/homeless-shelter")
      .env("TMPDIR", &tmp_dir)
      .env("TMP", &tmp_dir)
      .env("TEMP", &tmp_dir)
      .env("TEMPDIR", &tmp_dir)
      .env("LANG", "C")
      .env("LC_ALL", "C")
      .env("SOURCE_DATE_EPOCH", SOURCE_DATE_EPOCH)
      .envs(&process.env)
      .stdin(Stdio::null());

    debug!(program = %program, sandbox = ?root, "spawning process");
    let output = command.output().await.map_err(|source| ProcessError::Spawn {
      program: program.clone(),
      source,
    })?;
    let exit_code = output.status.code().unwrap_or(-1);

    let capture_root = root.clone();
    let output_directories = process.output_directories.clone();
    let output_files = process.output_files.clone();
    let image =
      tokio::task::spawn_blocking(move || disk::capture(&capture_root, &output_directories, &output_files)).await??;
    let output_digest = self.store.put(image);

    debug!(
      description = %process.description,
      exit_code,
      output = %output_digest,
      "process finished"
    );
    drop(sandbox);

    Ok(FallibleProcessResult {
      exit_code,
      stdout: output.stdout,
      stderr: output.stderr,
      output_digest,
    })
  }

  async fn prepare_sandbox(&self, process: &Process, root: &Path) -> Result<(), ProcessError> {
    let input = self.store.get(&process.input_digest)?;
    disk::materialize(&input, root).await?;

    tokio::fs::create_dir_all(root.join(SANDBOX_TMP_DIR))
      .await
      .map_err(ProcessError::Sandbox)?;
    for dir in &process.output_directories {
      tokio::fs::create_dir_all(root.join(dir))
        .await
        .map_err(ProcessError::Sandbox)?;
    }
    for file in &process.output_files {
      if let Some(parent) = root.join(file).parent() {
        tokio::fs::create_dir_all(parent).await.map_err(ProcessError::Sandbox)?;
      }
    }

    for (name, rel_path) in &process.append_only_caches {
      let host = self.cache_root.join(name);
      tokio::fs::create_dir_all(&host).await.map_err(ProcessError::Sandbox)?;
      link_cache(&host, &root.join(rel_path)).await?;
    }
    Ok(())
  }
}

#[cfg(unix)]
async fn link_cache(host: &Path, link: &Path) -> Result<(), ProcessError> {
  if let Some(parent) = link.parent() {
    tokio::fs::create_dir_all(parent).await.map_err(ProcessError::Sandbox)?;
  }
  tokio::fs::symlink(host, link).await.map_err(ProcessError::Sandbox)
}

#[cfg(not(unix))]
async fn link_cache(_host: &Path, link: &Path) -> Result<(), ProcessError> {
  tokio::fs::create_dir_all(link).await.map_err(ProcessError::Sandbox)
}

impl ProcessExecutor for LocalProcessExecutor {
  fn execute<'a>(&'a self, process: &'a Process) -> BoxFuture<'a, Result<FallibleProcessResult, ProcessError>> {
    self.run(process).boxed()
  }
}
