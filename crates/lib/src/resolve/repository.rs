//! Artifact repositories.
//!
//! A [`LockfileResolver`] turns a [`ResolveKey`] into its lockfile and serves
//! the verified bytes of each pinned artifact.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, instrument};

use super::{LockfileEntry, LockfileError, ResolveKey, ResolvedLockfile};
use crate::util::hash::hash_bytes;

/// Source of lockfiles and artifact contents.
pub trait LockfileResolver: Send + Sync {
  /// Load the lockfile named by `key`.
  fn resolve<'a>(&'a self, key: &'a ResolveKey) -> BoxFuture<'a, Result<Arc<ResolvedLockfile>, LockfileError>>;

  /// Fetch the bytes of one artifact, verified against its pinned checksum.
  fn fetch<'a>(&'a self, entry: &'a LockfileEntry) -> BoxFuture<'a, Result<Vec<u8>, LockfileError>>;
}

/// A flat directory of artifacts named by their lockfile `fileName`.
#[derive(Debug)]
pub struct LocalRepository {
  root: PathBuf,
  lockfiles: Mutex<HashMap<ResolveKey, Arc<ResolvedLockfile>>>,
}

impl LocalRepository {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      lockfiles: Mutex::new(HashMap::new()),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn cached(&self, key: &ResolveKey) -> Option<Arc<ResolvedLockfile>> {
    let lockfiles = self.lockfiles.lock().unwrap_or_else(PoisonError::into_inner);
    lockfiles.get(key).cloned()
  }

  #[instrument(skip(self), fields(resolve = %key.name))]
  async fn load(&self, key: &ResolveKey) -> Result<Arc<ResolvedLockfile>, LockfileError> {
    if let Some(lockfile) = self.cached(key) {
      return Ok(lockfile);
    }

    let content = tokio::fs::read_to_string(&key.path)
      .await
      .map_err(|source| LockfileError::Read {
        path: key.path.clone(),
        source,
      })?;
    let lockfile = Arc::new(ResolvedLockfile::parse(&content)?);
    debug!(entries = lockfile.entries.len(), "loaded lockfile");

    let mut lockfiles = self.lockfiles.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(lockfiles.entry(key.clone()).or_insert(lockfile).clone())
  }

  async fn read_artifact(&self, entry: &LockfileEntry) -> Result<Vec<u8>, LockfileError> {
    let path = self.root.join(&entry.file_name);
    let bytes = match tokio::fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(LockfileError::ArtifactMissing {
          coordinate: entry.coordinate.clone(),
          path,
        });
      }
      Err(source) => {
        return Err(LockfileError::ArtifactRead {
          coordinate: entry.coordinate.clone(),
          source,
        });
      }
    };

    verify(entry, &bytes)?;
    Ok(bytes)
  }
}

impl LockfileResolver for LocalRepository {
  fn resolve<'a>(&'a self, key: &'a ResolveKey) -> BoxFuture<'a, Result<Arc<ResolvedLockfile>, LockfileError>> {
    self.load(key).boxed()
  }

  fn fetch<'a>(&'a self, entry: &'a LockfileEntry) -> BoxFuture<'a, Result<Vec<u8>, LockfileError>> {
    self.read_artifact(entry).boxed()
  }
}

/// Check artifact bytes against the size and checksum pinned in the lockfile.
pub fn verify(entry: &LockfileEntry, bytes: &[u8]) -> Result<(), LockfileError> {
  let actual_size = bytes.len() as u64;
  if actual_size != entry.size {
    return Err(LockfileError::SizeMismatch {
      coordinate: entry.coordinate.clone(),
      expected: entry.size,
      actual: actual_size,
    });
  }

  let actual = hash_bytes(bytes);
  if !actual.0.eq_ignore_ascii_case(&entry.sha256) {
    return Err(LockfileError::ChecksumMismatch {
      coordinate: entry.coordinate.clone(),
      expected: entry.sha256.clone(),
      actual: actual.0,
    });
  }
  Ok(())
}
