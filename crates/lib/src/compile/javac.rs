//! Compiling a component with javac.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error, info, instrument, warn};

use super::classpath::assemble_classpath;
use super::dependencies::{DependencyClasspath, resolve_dependencies};
use super::invoke::run_javac;
use super::memo::CompileMemo;
use super::package::package;
use super::sources::collect_sources;
use super::{ClasspathEntry, CompileError, FallibleClasspathEntry};
use crate::archive::Archiver;
use crate::graph::Component;
use crate::image::ImageStore;
use crate::process::ProcessExecutor;
use crate::resolve::{LockfileResolver, ResolveKey};
use crate::sources::SourceProvider;
use crate::toolchain::JdkSetup;

/// Compile one component against one resolve.
#[derive(Debug, Clone)]
pub struct CompileJavaSourceRequest {
  pub component: Arc<Component>,
  pub resolve: ResolveKey,
}

impl CompileJavaSourceRequest {
  pub fn new(component: Arc<Component>, resolve: ResolveKey) -> Self {
    Self { component, resolve }
  }
}

/// Compiles components and memoizes the results for the lifetime of the
/// compiler.
pub struct JavacCompiler {
  store: ImageStore,
  sources: Arc<dyn SourceProvider>,
  lockfiles: Arc<dyn LockfileResolver>,
  executor: Arc<dyn ProcessExecutor>,
  archiver: Arc<dyn Archiver>,
  jdk: JdkSetup,
  memo: CompileMemo,
}

impl JavacCompiler {
  pub fn new(
    store: ImageStore,
    sources: Arc<dyn SourceProvider>,
    lockfiles: Arc<dyn LockfileResolver>,
    executor: Arc<dyn ProcessExecutor>,
    archiver: Arc<dyn Archiver>,
    jdk: JdkSetup,
  ) -> Self {
    Self {
      store,
      sources,
      lockfiles,
      executor,
      archiver,
      jdk,
      memo: CompileMemo::new(),
    }
  }

  pub fn store(&self) -> &ImageStore {
    &self.store
  }

  pub fn memo(&self) -> &CompileMemo {
    &self.memo
  }

  /// Compile `request`, or return the result of an identical earlier or
  /// in-flight request.
  pub fn compile(
    self: &Arc<Self>,
    request: CompileJavaSourceRequest,
  ) -> BoxFuture<'static, Result<FallibleClasspathEntry, CompileError>> {
    let compiler = Arc::clone(self);
    async move {
      let uncached = Arc::clone(&compiler);
      let id = request.component.id().clone();
      let resolve = request.resolve.clone();
      compiler
        .memo
        .get_or_try_compute(&id, &resolve, move || uncached.compile_uncached(request))
        .await
    }
    .boxed()
  }

  #[instrument(skip_all, fields(component = %request.component, resolve = %request.resolve.name))]
  async fn compile_uncached(self: Arc<Self>, request: CompileJavaSourceRequest) -> Result<FallibleClasspathEntry, CompileError> {
    let component = request.component.as_ref();
    let description = component.to_string();

    let (dependencies, sources) = tokio::try_join!(resolve_dependencies(&self, component, &request.resolve), async {
      Ok::<_, CompileError>(collect_sources(self.sources.as_ref(), component).await?)
    })?;

    let dependencies = match dependencies {
      DependencyClasspath::Resolved(entries) => entries,
      DependencyClasspath::Failed(cause) => {
        let entry = FallibleClasspathEntry::dependency_failed(description, &cause);
        warn!(root_cause = entry.root_cause.as_deref().unwrap_or_default(), "dependency failed, not compiling");
        return Ok(entry);
      }
    };

    if sources.is_empty() {
      let digest = self.store.merge(dependencies.iter().map(|entry| &entry.digest))?;
      debug!(dependencies = dependencies.len(), output = %digest, "no sources, passing dependencies through");
      return Ok(FallibleClasspathEntry::succeeded(description, ClasspathEntry::new(digest)));
    }

    let classpath = assemble_classpath(
      &self.store,
      self.lockfiles.as_ref(),
      component,
      &request.resolve,
      &dependencies,
    )
    .await?;

    let result = run_javac(
      &self.store,
      self.executor.as_ref(),
      &self.jdk,
      component,
      &classpath,
      &sources,
    )
    .await?;
    if !result.is_success() {
      error!(exit_code = result.exit_code, "javac failed");
      return Ok(FallibleClasspathEntry::from_fallible_process_result(description, &result, None));
    }

    let jar = package(&self.store, self.archiver.as_ref(), component, &result.output_digest).await?;
    info!(sources = sources.sorted_files().len(), output = %jar, "compiled");
    Ok(FallibleClasspathEntry::from_fallible_process_result(
      description,
      &result,
      Some(ClasspathEntry::new(jar)),
    ))
  }
}
