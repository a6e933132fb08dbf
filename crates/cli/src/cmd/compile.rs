//! Implementation of the `kiln compile` command.
//!
//! Compiles the requested targets (or every root of the build graph) and
//! writes the resulting jars into a dist directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use kiln_lib::archive::ZipArchiver;
use kiln_lib::compile::{CompileResult, FallibleClasspathEntry, JavacCompiler};
use kiln_lib::config::{KilnConfig, parse_parallelism};
use kiln_lib::consts::DEFAULT_RESOLVE;
use kiln_lib::execute::{CompileReport, compile_targets, export_artifacts};
use kiln_lib::graph::{BuildGraph, coarsen};
use kiln_lib::image::ImageStore;
use kiln_lib::process::LocalProcessExecutor;
use kiln_lib::resolve::LocalRepository;
use kiln_lib::sources::WorkspaceSourceProvider;
use kiln_lib::target::Address;
use kiln_lib::toolchain::JdkSetup;

use crate::output::{
  OutputFormat, format_duration, print_error, print_info, print_json, print_process_output, print_stat, print_success,
  print_warning,
};

#[derive(Debug, Args)]
pub struct CompileArgs {
  /// Target addresses to compile (default: every root of the graph)
  targets: Vec<String>,

  /// Resolve (lockfile) to compile against
  #[arg(long, default_value = DEFAULT_RESOLVE)]
  resolve: String,

  /// Directory the jars of the requested targets are written to
  #[arg(long, default_value = "dist")]
  dist: PathBuf,

  /// Maximum number of concurrent compiler processes
  #[arg(short, long, value_parser = parse_jobs)]
  jobs: Option<usize>,

  /// JDK installation to compile with (overrides KILN_JAVA_HOME and JAVA_HOME)
  #[arg(long)]
  java_home: Option<PathBuf>,

  /// Request a warm compiler daemon
  #[arg(long, conflicts_with = "no_daemon")]
  daemon: bool,

  /// Always start a cold compiler process
  #[arg(long)]
  no_daemon: bool,

  /// Output format
  #[arg(long, value_enum, default_value_t)]
  format: OutputFormat,
}

fn parse_jobs(value: &str) -> Result<usize, String> {
  parse_parallelism("--jobs", value).map_err(|e| e.to_string())
}

impl CompileArgs {
  fn apply(&self, config: &mut KilnConfig) {
    if let Some(jobs) = self.jobs {
      config.parallelism = jobs;
    }
    if let Some(java_home) = &self.java_home {
      config.java_home = Some(java_home.clone());
    }
    if self.daemon {
      config.use_daemon = true;
    }
    if self.no_daemon {
      config.use_daemon = false;
    }
  }
}

/// Execute the compile command.
///
/// Returns whether every requested target compiled successfully.
pub fn cmd_compile(graph_path: &Path, args: CompileArgs) -> Result<bool> {
  let started = Instant::now();

  let mut config = KilnConfig::from_env().context("Invalid configuration")?;
  args.apply(&mut config);

  let graph = BuildGraph::load(graph_path).with_context(|| format!("Failed to load {}", graph_path.display()))?;
  let addresses = args
    .targets
    .iter()
    .map(|spec| Address::parse(spec).with_context(|| format!("Invalid target address '{}'", spec)))
    .collect::<Result<Vec<_>>>()?;
  let coarsened = coarsen(&graph).context("Failed to coarsen build graph")?;
  let resolve = graph.resolve_key(&args.resolve);

  let store = ImageStore::new();
  let jdk = JdkSetup::from_config(&store, &config).context("Failed to set up the JDK")?;
  let repository = config.artifact_repo.clone().unwrap_or_else(|| graph.root().to_path_buf());
  info!(
    graph = %graph_path.display(),
    resolve = %resolve,
    repository = %repository.display(),
    parallelism = config.parallelism,
    "compiling"
  );

  let compiler = Arc::new(JavacCompiler::new(
    store.clone(),
    Arc::new(WorkspaceSourceProvider::new(graph.root(), store.clone())),
    Arc::new(LocalRepository::new(repository)),
    Arc::new(LocalProcessExecutor::new(store.clone(), config.parallelism, &config.cache_dir)),
    Arc::new(ZipArchiver::new(store.clone())),
    jdk,
  ));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let (report, exported) = rt.block_on(async {
    let report = compile_targets(&compiler, &coarsened, &addresses, &resolve)
      .await
      .context("Compile failed")?;
    let exported = export_artifacts(&store, &report, &args.dist)
      .await
      .with_context(|| format!("Failed to write jars to {}", args.dist.display()))?;
    Ok::<_, anyhow::Error>((report, exported))
  })?;

  if args.format.is_json() {
    print_json(&serde_json::json!({
      "report": report,
      "dist": args.dist,
      "exported": exported,
      "success": report.is_success(),
    }))?;
  } else {
    print_report(&report);
    println!();
    print_stat("Succeeded", &report.succeeded().count().to_string());
    print_stat("Failed", &report.failed().count().to_string());
    print_stat("Skipped", &report.dependency_failed().count().to_string());
    print_stat("Jars written", &format!("{} ({})", exported.len(), args.dist.display()));
    print_stat("Elapsed", &format_duration(started.elapsed()));
  }

  Ok(report.is_success())
}

fn print_report(report: &CompileReport) {
  print_info(&format!("Compiled {} components (resolve: {})", report.components.len(), report.resolve));
  for entry in report.components.values() {
    print_entry(entry);
  }
}

fn print_entry(entry: &FallibleClasspathEntry) {
  match entry.result {
    CompileResult::Succeeded => print_success(&entry.description),
    CompileResult::Failed => {
      print_error(&format!("{} failed with exit code {}", entry.description, entry.exit_code));
      print_process_output(&entry.stderr);
      print_process_output(&entry.stdout);
    }
    CompileResult::DependencyFailed => print_warning(&entry.message()),
  }
}
