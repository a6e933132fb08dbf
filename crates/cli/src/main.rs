mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{CompileArgs, cmd_compile, cmd_graph};
use output::OutputFormat;

/// kiln - compile Java build graphs one component at a time
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the build graph file
  #[arg(short, long, global = true, default_value = "BUILD.json")]
  graph: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the components of the build graph in dependency order
  Graph {
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Compile targets and write their jars to a dist directory
  Compile(CompileArgs),
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Graph { format } => cmd_graph(&cli.graph, format),
    Commands::Compile(args) => {
      let success = cmd_compile(&cli.graph, args)?;
      if !success {
        std::process::exit(1);
      }
      Ok(())
    }
  }
}
