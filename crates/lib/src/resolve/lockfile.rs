//! Resolved lockfiles.
//!
//! A lockfile pins every third-party artifact of one resolve, together with
//! its checksum and dependency lists. It is stored as JSON next to the build
//! graph.
//!
//! # Lockfile Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": [
//!     {
//!       "coordinate": "com.google.guava:guava:31.0-jre",
//!       "fileName": "com.google.guava_guava_31.0-jre.jar",
//!       "sha256": "a1b2c3...",
//!       "size": 2959479,
//!       "directDependencies": ["com.google.guava:failureaccess:1.0.1"],
//!       "dependencies": ["com.google.guava:failureaccess:1.0.1"]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Coordinate, Coordinates};
use crate::image::ImageError;

/// Current lockfile format version.
pub const LOCKFILE_VERSION: u32 = 1;

/// Errors that can occur when working with lockfiles and their artifacts.
#[derive(Debug, Error)]
pub enum LockfileError {
  #[error("failed to read lockfile {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse lockfile: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("unsupported lockfile version {0}, expected {LOCKFILE_VERSION}")]
  UnsupportedVersion(u32),

  #[error("invalid coordinate '{0}', expected group:artifact:version")]
  InvalidCoordinate(String),

  #[error("coordinate {0} is not present in the lockfile")]
  MissingCoordinate(Coordinate),

  #[error("artifact for {coordinate} not found at {path}")]
  ArtifactMissing { coordinate: Coordinate, path: PathBuf },

  #[error("failed to read artifact for {coordinate}: {source}")]
  ArtifactRead {
    coordinate: Coordinate,
    #[source]
    source: io::Error,
  },

  #[error("checksum mismatch for {coordinate}: expected {expected}, got {actual}")]
  ChecksumMismatch {
    coordinate: Coordinate,
    expected: String,
    actual: String,
  },

  #[error("size mismatch for {coordinate}: expected {expected} bytes, got {actual}")]
  SizeMismatch {
    coordinate: Coordinate,
    expected: u64,
    actual: u64,
  },

  #[error(transparent)]
  Image(#[from] ImageError),
}

/// A lockfile: every artifact of a resolve, in resolution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLockfile {
  pub version: u32,
  pub entries: Vec<LockfileEntry>,
}

/// One pinned artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockfileEntry {
  pub coordinate: Coordinate,
  /// File name of the artifact, unique within the lockfile.
  pub file_name: String,
  /// Lowercase hex SHA256 of the artifact.
  pub sha256: String,
  pub size: u64,
  #[serde(default)]
  pub direct_dependencies: Vec<Coordinate>,
  /// Transitive dependencies.
  #[serde(default)]
  pub dependencies: Vec<Coordinate>,
}

impl Default for ResolvedLockfile {
  fn default() -> Self {
    Self::new(Vec::new())
  }
}

impl ResolvedLockfile {
  pub fn new(entries: Vec<LockfileEntry>) -> Self {
    Self {
      version: LOCKFILE_VERSION,
      entries,
    }
  }

  pub fn parse(content: &str) -> Result<Self, LockfileError> {
    let lockfile: ResolvedLockfile = serde_json::from_str(content).map_err(LockfileError::Parse)?;
    if lockfile.version != LOCKFILE_VERSION {
      return Err(LockfileError::UnsupportedVersion(lockfile.version));
    }
    Ok(lockfile)
  }

  pub fn entry(&self, coordinate: &Coordinate) -> Option<&LockfileEntry> {
    self.entries.iter().find(|entry| entry.coordinate == *coordinate)
  }

  /// The entry for `coordinate` followed by the entries of its transitive dependencies.
  pub fn dependencies(&self, coordinate: &Coordinate) -> Result<Vec<&LockfileEntry>, LockfileError> {
    let root = self
      .entry(coordinate)
      .ok_or_else(|| LockfileError::MissingCoordinate(coordinate.clone()))?;

    let mut entries = vec![root];
    for dependency in &root.dependencies {
      let entry = self
        .entry(dependency)
        .ok_or_else(|| LockfileError::MissingCoordinate(dependency.clone()))?;
      entries.push(entry);
    }
    Ok(entries)
  }

  /// Keep only `coordinates` and their transitive dependencies.
  ///
  /// Coordinates are visited in sorted order; each entry is kept at its first
  /// occurrence.
  pub fn filter(&self, coordinates: &Coordinates) -> Result<ResolvedLockfile, LockfileError> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for coordinate in coordinates.iter() {
      for entry in self.dependencies(coordinate)? {
        if seen.insert(&entry.coordinate) {
          entries.push(entry.clone());
        }
      }
    }
    Ok(ResolvedLockfile::new(entries))
  }
}

impl LockfileEntry {
  pub fn new(coordinate: Coordinate, file_name: &str, sha256: &str, size: u64) -> Self {
    Self {
      coordinate,
      file_name: file_name.to_string(),
      sha256: sha256.to_string(),
      size,
      direct_dependencies: Vec::new(),
      dependencies: Vec::new(),
    }
  }

  pub fn with_dependencies(mut self, direct: Vec<Coordinate>, transitive: Vec<Coordinate>) -> Self {
    self.direct_dependencies = direct;
    self.dependencies = transitive;
    self
  }
}
