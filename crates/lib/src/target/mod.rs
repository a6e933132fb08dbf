//! Build targets.
//!
//! A target is the unit users declare in the build graph. Three kinds exist:
//! - `java_sources`: Java source files to compile
//! - `jvm_artifact`: a third-party library identified by a coordinate
//! - `alias`: no fields of its own, only dependencies

mod address;

use serde::{Deserialize, Serialize};

use crate::resolve::Coordinate;

pub use address::{Address, AddressError};

/// What a target declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKind {
  /// Java sources, as paths relative to the workspace root.
  JavaSources { sources: Vec<String> },
  /// A third-party artifact resolved through the lockfile.
  JvmArtifact { coordinate: Coordinate },
  /// A target with dependencies only.
  Alias,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  pub address: Address,
  pub kind: TargetKind,
  pub dependencies: Vec<Address>,
}

impl Target {
  pub fn new(address: Address, kind: TargetKind, dependencies: Vec<Address>) -> Self {
    Self {
      address,
      kind,
      dependencies,
    }
  }

  /// Declared source paths, if this target has a sources field at all.
  pub fn sources(&self) -> Option<&[String]> {
    match &self.kind {
      TargetKind::JavaSources { sources } => Some(sources),
      _ => None,
    }
  }

  /// The artifact coordinate, if this target is a fetchable library.
  pub fn coordinate(&self) -> Option<&Coordinate> {
    match &self.kind {
      TargetKind::JvmArtifact { coordinate } => Some(coordinate),
      _ => None,
    }
  }

  pub fn kind_name(&self) -> &'static str {
    match self.kind {
      TargetKind::JavaSources { .. } => "java_sources",
      TargetKind::JvmArtifact { .. } => "jvm_artifact",
      TargetKind::Alias => "alias",
    }
  }
}
