//! The build graph.
//!
//! A build graph is declared in a JSON file listing every target and the
//! named resolves (lockfiles) available to compilations:
//!
//! ```json
//! {
//!   "resolves": { "default": "3rdparty/default.lock.json" },
//!   "targets": [
//!     { "address": "//:guava", "kind": "jvm_artifact", "coordinate": "com.google.guava:guava:31.0-jre" },
//!     { "address": "src/app", "kind": "java_sources", "sources": ["src/app"], "dependencies": ["//:guava"] }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory containing the file.

mod coarsen;
mod component;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::LOCKFILE_SUFFIX;
use crate::resolve::ResolveKey;
use crate::target::{Address, Target, TargetKind};
use crate::util::hash::HashError;

pub use coarsen::{CoarsenedGraph, coarsen};
pub use component::{Component, ComponentId};

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("failed to read build graph {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse build graph: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("target {0} is declared more than once")]
  DuplicateAddress(Address),

  #[error("{address} depends on unknown target {dependency}")]
  UnknownDependency { address: Address, dependency: Address },

  #[error("no target found for {0}")]
  UnknownTarget(Address),

  #[error("a component must have at least one member")]
  EmptyComponent,

  #[error("failed to compute component identity: {0}")]
  Hash(#[source] HashError),
}

#[derive(Debug, Deserialize)]
struct GraphFile {
  #[serde(default)]
  resolves: BTreeMap<String, PathBuf>,
  #[serde(default)]
  targets: Vec<TargetDecl>,
}

#[derive(Debug, Deserialize)]
struct TargetDecl {
  address: Address,
  #[serde(flatten)]
  kind: TargetKind,
  #[serde(default)]
  dependencies: Vec<Address>,
}

/// Every target of a workspace, keyed by address.
#[derive(Debug, Clone)]
pub struct BuildGraph {
  root: PathBuf,
  targets: BTreeMap<Address, Target>,
  resolves: BTreeMap<String, PathBuf>,
}

impl BuildGraph {
  /// Load and validate a build graph file.
  pub fn load(path: &Path) -> Result<Self, GraphError> {
    let content = std::fs::read_to_string(path).map_err(|source| GraphError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Self::parse(&content, root)
  }

  pub fn parse(content: &str, root: impl Into<PathBuf>) -> Result<Self, GraphError> {
    let file: GraphFile = serde_json::from_str(content).map_err(GraphError::Parse)?;
    let targets = file
      .targets
      .into_iter()
      .map(|decl| Target::new(decl.address, decl.kind, decl.dependencies))
      .collect();
    Self::new(root, targets, file.resolves)
  }

  /// Build a graph from targets, rejecting duplicates and dangling dependencies.
  pub fn new(
    root: impl Into<PathBuf>,
    targets: Vec<Target>,
    resolves: BTreeMap<String, PathBuf>,
  ) -> Result<Self, GraphError> {
    let mut by_address = BTreeMap::new();
    for target in targets {
      if by_address.contains_key(&target.address) {
        return Err(GraphError::DuplicateAddress(target.address));
      }
      by_address.insert(target.address.clone(), target);
    }

    for target in by_address.values() {
      for dependency in &target.dependencies {
        if !by_address.contains_key(dependency) {
          return Err(GraphError::UnknownDependency {
            address: target.address.clone(),
            dependency: dependency.clone(),
          });
        }
      }
    }

    debug!(targets = by_address.len(), resolves = resolves.len(), "loaded build graph");
    Ok(Self {
      root: root.into(),
      targets: by_address,
      resolves,
    })
  }

  /// Directory relative paths are resolved against.
  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn target(&self, address: &Address) -> Option<&Target> {
    self.targets.get(address)
  }

  /// Targets in address order.
  pub fn targets(&self) -> impl Iterator<Item = &Target> {
    self.targets.values()
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }

  /// The resolve key for `name`.
  ///
  /// Undeclared resolves map to `<root>/<name>.lock.json`.
  pub fn resolve_key(&self, name: &str) -> ResolveKey {
    let path = match self.resolves.get(name) {
      Some(path) => self.root.join(path),
      None => self.root.join(format!("{}{}", name, LOCKFILE_SUFFIX)),
    };
    ResolveKey::new(name, path)
  }
}
