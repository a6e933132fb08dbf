//! Realizing a target's declared sources as an image.

use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::trace;
use walkdir::WalkDir;

use crate::image::{FileContent, Image, ImageError, ImageStore, Snapshot};
use crate::target::{Address, Target};

/// Extension of compilable sources.
pub const JAVA_EXTENSION: &str = "java";

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("source '{path}' declared by {address} does not exist")]
  Missing { address: Address, path: String },

  #[error("failed to read source {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to walk {path}: {message}")]
  Walk { path: PathBuf, message: String },

  #[error(transparent)]
  Image(#[from] ImageError),

  #[error("source reading task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// The realized source files of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles {
  pub snapshot: Snapshot,
}

impl SourceFiles {
  pub fn empty() -> Self {
    Self {
      snapshot: Image::new().snapshot(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.snapshot.files.is_empty()
  }
}

/// Retrieves the compilable sources of a target.
pub trait SourceProvider: Send + Sync {
  /// Sources of `target`, or an empty set when it declares none.
  fn source_files<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, Result<SourceFiles, SourceError>>;
}

/// Reads sources from a workspace directory.
///
/// A declared source path may be a file or a directory; directories
/// contribute every `.java` file below them.
#[derive(Debug, Clone)]
pub struct WorkspaceSourceProvider {
  root: PathBuf,
  store: ImageStore,
}

impl WorkspaceSourceProvider {
  pub fn new(root: impl Into<PathBuf>, store: ImageStore) -> Self {
    Self {
      root: root.into(),
      store,
    }
  }

  async fn collect(&self, target: &Target) -> Result<SourceFiles, SourceError> {
    let Some(sources) = target.sources() else {
      return Ok(SourceFiles::empty());
    };

    let root = self.root.clone();
    let address = target.address.clone();
    let sources = sources.to_vec();
    let image = tokio::task::spawn_blocking(move || read_sources(&root, &address, &sources)).await??;

    let digest = self.store.put(image);
    let snapshot = self.store.snapshot(&digest)?;
    trace!(address = %target.address, files = snapshot.files.len(), digest = %digest, "collected sources");
    Ok(SourceFiles { snapshot })
  }
}

impl SourceProvider for WorkspaceSourceProvider {
  fn source_files<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, Result<SourceFiles, SourceError>> {
    self.collect(target).boxed()
  }
}

/// Read every declared source of `address` below `root`.
fn read_sources(root: &Path, address: &Address, sources: &[String]) -> Result<Image, SourceError> {
  let mut image = Image::new();
  for declared in sources {
    let path = root.join(declared);
    if path.is_dir() {
      add_directory(&mut image, root, &path)?;
    } else if path.is_file() {
      if is_java(&path) {
        add_file(&mut image, root, &path)?;
      }
    } else {
      return Err(SourceError::Missing {
        address: address.clone(),
        path: declared.clone(),
      });
    }
  }
  Ok(image)
}

fn add_directory(image: &mut Image, root: &Path, dir: &Path) -> Result<(), SourceError> {
  for entry in WalkDir::new(dir).sort_by_file_name() {
    let entry = entry.map_err(|e| SourceError::Walk {
      path: dir.to_path_buf(),
      message: e.to_string(),
    })?;
    if entry.file_type().is_file() && is_java(entry.path()) {
      add_file(image, root, entry.path())?;
    }
  }
  Ok(())
}

fn add_file(image: &mut Image, root: &Path, path: &Path) -> Result<(), SourceError> {
  let rel = path.strip_prefix(root).unwrap_or(path);
  let rel = rel.to_str().ok_or_else(|| {
    SourceError::Image(ImageError::InvalidPath {
      path: rel.display().to_string(),
      reason: "not valid UTF-8",
    })
  })?;
  let bytes = std::fs::read(path).map_err(|source| SourceError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  image.insert_file(rel, FileContent::new(bytes))?;
  Ok(())
}

fn is_java(path: &Path) -> bool {
  path.extension().is_some_and(|ext| ext == JAVA_EXTENSION)
}
