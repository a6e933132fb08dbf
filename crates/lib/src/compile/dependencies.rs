//! Resolving the classpath of a component's direct dependencies.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;

use super::{ClasspathEntry, CompileError, CompileJavaSourceRequest, FallibleClasspathEntry, JavacCompiler};
use crate::graph::Component;
use crate::resolve::ResolveKey;

/// Aggregated outcome of compiling every direct dependency.
#[derive(Debug, Clone)]
pub enum DependencyClasspath {
  /// Every dependency succeeded; outputs in dependency order.
  Resolved(Vec<ClasspathEntry>),
  /// The first dependency (in dependency order) that did not succeed.
  Failed(FallibleClasspathEntry),
}

/// Compile every direct dependency of `component` concurrently.
pub async fn resolve_dependencies(
  compiler: &Arc<JavacCompiler>,
  component: &Component,
  resolve: &ResolveKey,
) -> Result<DependencyClasspath, CompileError> {
  let dependencies = component.dependencies();
  let mut join_set: JoinSet<(usize, Result<FallibleClasspathEntry, CompileError>)> = JoinSet::new();

  for (index, dependency) in dependencies.iter().enumerate() {
    let request = CompileJavaSourceRequest::new(dependency.clone(), resolve.clone());
    let compile = compiler.compile(request);
    join_set.spawn(async move { (index, compile.await) });
  }

  let mut results = Vec::with_capacity(dependencies.len());
  while let Some(joined) = join_set.join_next().await {
    let (index, result) = joined?;
    results.push((index, result?));
  }
  results.sort_by_key(|(index, _)| *index);

  let mut entries = Vec::with_capacity(results.len());
  for (_, result) in results {
    match result.output {
      Some(output) => entries.push(output),
      None => {
        debug!(
          component = %component,
          dependency = %result.description,
          result = %result.result,
          "dependency did not succeed"
        );
        return Ok(DependencyClasspath::Failed(result));
      }
    }
  }

  Ok(DependencyClasspath::Resolved(entries))
}
