//! Test utilities for kiln-lib.
//!
//! In-memory collaborators for exercising the compile pipeline without a
//! JDK: sources held in a map, a lockfile with its artifacts, and a process
//! executor that pretends to be javac and records every invocation.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::archive::{ArchiveError, Archiver, ZipArchiver};
use crate::compile::JavacCompiler;
use crate::consts::CLASSFILES_DIR;
use crate::graph::BuildGraph;
use crate::image::{Digest, FileContent, Image, ImageStore};
use crate::process::{FallibleProcessResult, Process, ProcessError, ProcessExecutor};
use crate::resolve::repository::verify;
use crate::resolve::{Coordinate, LockfileEntry, LockfileError, LockfileResolver, ResolveKey, ResolvedLockfile};
use crate::sources::{SourceError, SourceFiles, SourceProvider};
use crate::target::{Address, Target, TargetKind};
use crate::toolchain::JdkSetup;
use crate::util::hash::hash_bytes;

/// Marker that makes the fake compiler fail on a source file.
pub const COMPILE_ERROR: &str = "COMPILE_ERROR";

pub fn addr(spec: &str) -> Address {
  Address::parse(spec).unwrap()
}

fn addrs(specs: &[&str]) -> Vec<Address> {
  specs.iter().map(|s| addr(s)).collect()
}

pub fn java(spec: &str, sources: &[&str], deps: &[&str]) -> Target {
  Target::new(
    addr(spec),
    TargetKind::JavaSources {
      sources: sources.iter().map(|s| s.to_string()).collect(),
    },
    addrs(deps),
  )
}

pub fn artifact(spec: &str, coordinate: &str) -> Target {
  Target::new(
    addr(spec),
    TargetKind::JvmArtifact {
      coordinate: Coordinate::parse(coordinate).unwrap(),
    },
    vec![],
  )
}

pub fn alias(spec: &str, deps: &[&str]) -> Target {
  Target::new(addr(spec), TargetKind::Alias, addrs(deps))
}

pub fn graph(targets: Vec<Target>) -> BuildGraph {
  BuildGraph::new("/ws", targets, BTreeMap::new()).unwrap()
}

pub fn default_resolve() -> ResolveKey {
  ResolveKey::new("default", "/ws/default.lock.json")
}

/// Sources kept in memory, keyed by workspace-relative path.
pub struct MemorySourceProvider {
  store: ImageStore,
  files: BTreeMap<String, String>,
}

impl MemorySourceProvider {
  pub fn new(store: ImageStore) -> Self {
    Self {
      store,
      files: BTreeMap::new(),
    }
  }

  pub fn with_file(mut self, path: &str, content: &str) -> Self {
    self.files.insert(path.to_string(), content.to_string());
    self
  }

  fn collect(&self, target: &Target) -> Result<SourceFiles, SourceError> {
    let Some(declared) = target.sources() else {
      return Ok(SourceFiles::empty());
    };

    let mut image = Image::new();
    for path in declared {
      let prefix = format!("{}/", path);
      let matching: Vec<_> = self
        .files
        .iter()
        .filter(|(file, _)| *file == path || file.starts_with(&prefix))
        .collect();
      if matching.is_empty() {
        return Err(SourceError::Missing {
          address: target.address.clone(),
          path: path.clone(),
        });
      }
      for (file, content) in matching {
        if file.ends_with(".java") {
          image.insert_file(file, FileContent::new(content.as_bytes().to_vec()))?;
        }
      }
    }

    self.store.put(image.clone());
    Ok(SourceFiles {
      snapshot: image.snapshot(),
    })
  }
}

impl SourceProvider for MemorySourceProvider {
  fn source_files<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, Result<SourceFiles, SourceError>> {
    async move { self.collect(target) }.boxed()
  }
}

/// A fake javac.
///
/// Every source after `-d classfiles` that contains `class ` produces
/// `classfiles/<stem>.class` holding the source bytes; a source containing
/// [`COMPILE_ERROR`] makes the run exit 1.
pub struct RecordingExecutor {
  store: ImageStore,
  invocations: Mutex<Vec<Process>>,
  delay: Option<Duration>,
}

impl RecordingExecutor {
  pub fn new(store: ImageStore) -> Self {
    Self {
      store,
      invocations: Mutex::new(Vec::new()),
      delay: None,
    }
  }

  /// Sleep before every invocation to widen race windows.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn invocations(&self) -> Vec<Process> {
    self.invocations.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn count(&self) -> usize {
    self.invocations().len()
  }

  /// Number of javac invocations for the component described as `spec`.
  pub fn count_for(&self, spec: &str) -> usize {
    self
      .invocations()
      .iter()
      .filter(|p| p.description == format!("Compile {} with javac", spec))
      .count()
  }

  /// The `-cp` argument of the invocation for `spec`.
  pub fn classpath_for(&self, spec: &str) -> Option<String> {
    let invocation = self
      .invocations()
      .into_iter()
      .find(|p| p.description == format!("Compile {} with javac", spec))?;
    let main = invocation.argv.iter().position(|a| a == crate::consts::JAVAC_MAIN_CLASS)?;
    let rest = &invocation.argv[main + 1..];
    match rest {
      [flag, value, ..] if flag == "-cp" => Some(value.clone()),
      _ => None,
    }
  }

  fn run(&self, process: &Process) -> Result<FallibleProcessResult, ProcessError> {
    let input = self.store.get(&process.input_digest)?;
    let sources = match process.argv.iter().position(|a| a == "-d") {
      Some(index) => &process.argv[index + 2..],
      None => &process.argv[..0],
    };

    let mut output = Image::new();
    output.insert_dir(CLASSFILES_DIR)?;
    let mut stderr = String::new();
    for source in sources {
      let bytes = input.file(source).map(|f| f.bytes.to_vec()).unwrap_or_default();
      let content = String::from_utf8_lossy(&bytes);
      if content.contains(COMPILE_ERROR) {
        stderr.push_str(&format!("{}:1: error: {}\n", source, COMPILE_ERROR));
        continue;
      }
      if content.contains("class ") {
        let stem = Path::new(source).file_stem().unwrap().to_string_lossy();
        output.insert_file(&format!("{}/{}.class", CLASSFILES_DIR, stem), FileContent::new(bytes.clone()))?;
      }
    }

    if !stderr.is_empty() {
      return Ok(FallibleProcessResult {
        exit_code: 1,
        stdout: Vec::new(),
        stderr: stderr.into_bytes(),
        output_digest: self.store.put(Image::new()),
      });
    }
    Ok(FallibleProcessResult {
      exit_code: 0,
      stdout: Vec::new(),
      stderr: Vec::new(),
      output_digest: self.store.put(output),
    })
  }
}

impl ProcessExecutor for RecordingExecutor {
  fn execute<'a>(&'a self, process: &'a Process) -> BoxFuture<'a, Result<FallibleProcessResult, ProcessError>> {
    async move {
      self
        .invocations
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(process.clone());
      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }
      self.run(process)
    }
    .boxed()
  }
}

/// A fixed lockfile whose artifacts are held in memory.
#[derive(Default)]
pub struct StaticLockfileResolver {
  lockfile: Arc<ResolvedLockfile>,
  artifacts: HashMap<String, Vec<u8>>,
}

impl StaticLockfileResolver {
  pub fn new() -> Self {
    Self::default()
  }

  /// Pin `coordinate` with `bytes` and the given transitive dependencies.
  pub fn with_artifact(mut self, coordinate: &str, bytes: &[u8], dependencies: &[&str]) -> Self {
    let coordinate = Coordinate::parse(coordinate).unwrap();
    let file_name = format!("{}_{}_{}.jar", coordinate.group, coordinate.artifact, coordinate.version);
    let dependencies: Vec<Coordinate> = dependencies.iter().map(|d| Coordinate::parse(d).unwrap()).collect();
    let entry = LockfileEntry::new(coordinate, &file_name, &hash_bytes(bytes).0, bytes.len() as u64)
      .with_dependencies(dependencies.clone(), dependencies);

    let mut entries = self.lockfile.entries.clone();
    entries.push(entry);
    self.lockfile = Arc::new(ResolvedLockfile::new(entries));
    self.artifacts.insert(file_name, bytes.to_vec());
    self
  }
}

impl LockfileResolver for StaticLockfileResolver {
  fn resolve<'a>(&'a self, _key: &'a ResolveKey) -> BoxFuture<'a, Result<Arc<ResolvedLockfile>, LockfileError>> {
    async move { Ok(self.lockfile.clone()) }.boxed()
  }

  fn fetch<'a>(&'a self, entry: &'a LockfileEntry) -> BoxFuture<'a, Result<Vec<u8>, LockfileError>> {
    async move {
      let bytes = self
        .artifacts
        .get(&entry.file_name)
        .cloned()
        .ok_or_else(|| LockfileError::ArtifactMissing {
          coordinate: entry.coordinate.clone(),
          path: entry.file_name.clone().into(),
        })?;
      verify(entry, &bytes)?;
      Ok(bytes)
    }
    .boxed()
  }
}

/// A compiler wired to in-memory collaborators and the zip archiver.
pub fn compiler(
  store: &ImageStore,
  sources: MemorySourceProvider,
  lockfiles: StaticLockfileResolver,
  executor: Arc<RecordingExecutor>,
) -> Arc<JavacCompiler> {
  let archiver = Arc::new(ZipArchiver::new(store.clone()));
  compiler_with_archiver(store, sources, lockfiles, executor, archiver)
}

pub fn compiler_with_archiver(
  store: &ImageStore,
  sources: MemorySourceProvider,
  lockfiles: StaticLockfileResolver,
  executor: Arc<RecordingExecutor>,
  archiver: Arc<dyn Archiver>,
) -> Arc<JavacCompiler> {
  let jdk = JdkSetup::new(store, Path::new("/opt/jdk"), false, "/bin/sh").unwrap();
  Arc::new(JavacCompiler::new(
    store.clone(),
    Arc::new(sources),
    Arc::new(lockfiles),
    executor,
    archiver,
    jdk,
  ))
}

/// An archiver that never finds the classfiles directory.
pub struct FailingArchiver;

impl Archiver for FailingArchiver {
  fn archive<'a>(
    &'a self,
    _input: &'a Digest,
    directory: &'a str,
    _output_file: &'a str,
  ) -> BoxFuture<'a, Result<Digest, ArchiveError>> {
    async move { Err(ArchiveError::MissingDirectory(directory.to_string())) }.boxed()
  }
}
