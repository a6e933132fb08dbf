//! Compiling a set of requested targets.
//!
//! This is the entry point used by the CLI. It:
//! - maps requested addresses to their components (or takes every root)
//! - compiles those components concurrently through one shared compiler
//! - collects every result the compiler produced into a [`CompileReport`]
//! - optionally writes the requested outputs to a dist directory

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::compile::{CompileError, CompileJavaSourceRequest, CompileResult, FallibleClasspathEntry, JavacCompiler};
use crate::graph::{CoarsenedGraph, Component, GraphError};
use crate::image::{Digest, ImageError, ImageStore, disk};
use crate::resolve::ResolveKey;
use crate::target::Address;

/// Results of one compile run.
#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
  pub resolve: String,
  /// Components that were asked for, in request order.
  pub requested: Vec<String>,
  /// Every component compiled during the run, keyed by description.
  pub components: BTreeMap<String, FallibleClasspathEntry>,
}

impl CompileReport {
  fn with_result(&self, result: CompileResult) -> impl Iterator<Item = &FallibleClasspathEntry> {
    self.components.values().filter(move |entry| entry.result == result)
  }

  pub fn succeeded(&self) -> impl Iterator<Item = &FallibleClasspathEntry> {
    self.with_result(CompileResult::Succeeded)
  }

  pub fn failed(&self) -> impl Iterator<Item = &FallibleClasspathEntry> {
    self.with_result(CompileResult::Failed)
  }

  pub fn dependency_failed(&self) -> impl Iterator<Item = &FallibleClasspathEntry> {
    self.with_result(CompileResult::DependencyFailed)
  }

  /// True when every requested component succeeded.
  pub fn is_success(&self) -> bool {
    self
      .requested
      .iter()
      .all(|name| self.components.get(name).is_some_and(FallibleClasspathEntry::is_success))
  }

  /// Outputs of the requested components that succeeded.
  pub fn requested_outputs(&self) -> Vec<&Digest> {
    self
      .requested
      .iter()
      .filter_map(|name| self.components.get(name))
      .filter_map(|entry| entry.output.as_ref())
      .map(|output| &output.digest)
      .collect()
  }
}

/// Compile `components` concurrently under `resolve`.
pub async fn compile_components(
  compiler: &Arc<JavacCompiler>,
  components: &[Arc<Component>],
  resolve: &ResolveKey,
) -> Result<CompileReport, CompileError> {
  info!(components = components.len(), resolve = %resolve.name, "starting compile");

  let mut join_set: JoinSet<Result<FallibleClasspathEntry, CompileError>> = JoinSet::new();
  for component in components {
    let request = CompileJavaSourceRequest::new(component.clone(), resolve.clone());
    join_set.spawn(compiler.compile(request));
  }
  while let Some(joined) = join_set.join_next().await {
    joined??;
  }

  let components_by_name: BTreeMap<String, FallibleClasspathEntry> = compiler
    .memo()
    .completed(resolve)
    .into_iter()
    .map(|entry| (entry.description.clone(), entry))
    .collect();

  let report = CompileReport {
    resolve: resolve.name.clone(),
    requested: components.iter().map(|c| c.to_string()).collect(),
    components: components_by_name,
  };

  for entry in report.failed() {
    error!(component = %entry.description, exit_code = entry.exit_code, "compile failed");
  }
  for entry in report.dependency_failed() {
    warn!(
      component = %entry.description,
      root_cause = entry.root_cause.as_deref().unwrap_or_default(),
      "skipped due to failed dependency"
    );
  }
  info!(
    succeeded = report.succeeded().count(),
    failed = report.failed().count(),
    dependency_failed = report.dependency_failed().count(),
    "compile complete"
  );
  Ok(report)
}

/// Compile the components owning `addresses`, or every root component when
/// `addresses` is empty.
pub async fn compile_targets(
  compiler: &Arc<JavacCompiler>,
  graph: &CoarsenedGraph,
  addresses: &[Address],
  resolve: &ResolveKey,
) -> Result<CompileReport, CompileError> {
  let components = if addresses.is_empty() {
    graph.roots()
  } else {
    let mut seen = BTreeSet::new();
    let mut components = Vec::new();
    for address in addresses {
      let component = graph
        .component_for(address)
        .ok_or_else(|| GraphError::UnknownTarget(address.clone()))?;
      if seen.insert(component.id().clone()) {
        components.push(component.clone());
      }
    }
    components
  };

  compile_components(compiler, &components, resolve).await
}

/// Write the outputs of the requested components into `dist`.
///
/// Returns the relative paths of the files written.
pub async fn export_artifacts(store: &ImageStore, report: &CompileReport, dist: &Path) -> Result<Vec<String>, ImageError> {
  let merged = store.merge(report.requested_outputs())?;
  let image = store.get(&merged)?;
  disk::materialize(&image, dist).await?;

  let files: Vec<String> = image.files().map(|(path, _)| path.to_string()).collect();
  info!(dist = ?dist, files = files.len(), "exported artifacts");
  Ok(files)
}
