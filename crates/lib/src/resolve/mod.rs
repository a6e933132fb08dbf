//! Third-party dependency resolution.
//!
//! Lockfile computation happens elsewhere; this module consumes its output:
//! - `Coordinate` / `Coordinates`: artifact identities
//! - `ResolveKey`: names the lockfile a compilation runs against
//! - `lockfile`: loading and filtering resolved lockfiles
//! - `repository`: serving and verifying artifact bytes
//! - `materialize`: laying artifacts out as classpath entries

pub mod lockfile;
pub mod materialize;
pub mod repository;

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use lockfile::{LockfileEntry, LockfileError, ResolvedLockfile};
pub use materialize::{MaterializedClasspath, materialize_classpath};
pub use repository::{LocalRepository, LockfileResolver};

/// A Maven-style `group:artifact:version` coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
  pub group: String,
  pub artifact: String,
  pub version: String,
}

impl Coordinate {
  pub fn new(group: &str, artifact: &str, version: &str) -> Self {
    Self {
      group: group.to_string(),
      artifact: artifact.to_string(),
      version: version.to_string(),
    }
  }

  pub fn parse(value: &str) -> Result<Self, LockfileError> {
    let parts: Vec<&str> = value.split(':').collect();
    match parts.as_slice() {
      [group, artifact, version] if !group.is_empty() && !artifact.is_empty() && !version.is_empty() => {
        Ok(Self::new(group, artifact, version))
      }
      _ => Err(LockfileError::InvalidCoordinate(value.to_string())),
    }
  }
}

impl std::fmt::Display for Coordinate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
  }
}

impl TryFrom<String> for Coordinate {
  type Error = LockfileError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<Coordinate> for String {
  fn from(coordinate: Coordinate) -> Self {
    coordinate.to_string()
  }
}

/// An ordered, deduplicated set of coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coordinates(BTreeSet<Coordinate>);

impl Coordinates {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
    self.0.iter()
  }
}

impl FromIterator<Coordinate> for Coordinates {
  fn from_iter<I: IntoIterator<Item = Coordinate>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Identifies the resolution universe (lockfile) a compilation runs against.
///
/// Two compile requests for the same component under different keys are
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolveKey {
  pub name: String,
  pub path: PathBuf,
}

impl ResolveKey {
  pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
    Self {
      name: name.to_string(),
      path: path.into(),
    }
  }
}

impl std::fmt::Display for ResolveKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({})", self.name, self.path.display())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_coordinate() {
    let coordinate = Coordinate::parse("com.google.guava:guava:31.0-jre").unwrap();
    assert_eq!(coordinate.group, "com.google.guava");
    assert_eq!(coordinate.artifact, "guava");
    assert_eq!(coordinate.version, "31.0-jre");
    assert_eq!(coordinate.to_string(), "com.google.guava:guava:31.0-jre");
  }

  #[test]
  fn parse_rejects_malformed_coordinates() {
    assert!(Coordinate::parse("guava").is_err());
    assert!(Coordinate::parse("a::1").is_err());
    assert!(Coordinate::parse("a:b:c:d").is_err());
  }

  #[test]
  fn coordinates_are_sorted_and_deduplicated() {
    let coordinates: Coordinates = [
      Coordinate::new("org.b", "b", "1"),
      Coordinate::new("org.a", "a", "1"),
      Coordinate::new("org.b", "b", "1"),
    ]
    .into_iter()
    .collect();

    let rendered: Vec<String> = coordinates.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["org.a:a:1", "org.b:b:1"]);
  }

  #[test]
  fn resolve_keys_differ_by_name() {
    let default = ResolveKey::new("default", "default.lock.json");
    let other = ResolveKey::new("other", "default.lock.json");
    assert_ne!(default, other);
  }
}
