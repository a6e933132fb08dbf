//! Implementation of the `kiln graph` command.
//!
//! Loads the build graph, coarsens cycles into components and lists the
//! components in the order they would be compiled.

use std::path::Path;

use anyhow::{Context, Result};

use kiln_lib::graph::{BuildGraph, coarsen};

use crate::output::{OutputFormat, print_info, print_json, print_stat, symbols, truncate_hash};

pub fn cmd_graph(graph_path: &Path, format: OutputFormat) -> Result<()> {
  let graph = BuildGraph::load(graph_path).with_context(|| format!("Failed to load {}", graph_path.display()))?;
  let coarsened = coarsen(&graph).context("Failed to coarsen build graph")?;

  if format.is_json() {
    let components: Vec<_> = coarsened
      .components()
      .iter()
      .map(|component| {
        serde_json::json!({
          "component": component.to_string(),
          "id": component.id().to_string(),
          "cycle": component.is_cycle(),
          "members": component.members().iter().map(|t| t.address.spec()).collect::<Vec<_>>(),
          "dependencies": component.dependencies().iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        })
      })
      .collect();
    let roots: Vec<_> = coarsened.roots().iter().map(|c| c.to_string()).collect();
    return print_json(&serde_json::json!({ "targets": graph.len(), "components": components, "roots": roots }));
  }

  print_info(&format!("{} targets in {} components", graph.len(), coarsened.len()));
  println!();
  for component in coarsened.components() {
    let marker = if component.is_cycle() { " (cycle)" } else { "" };
    println!(
      "  {} {} [{}]{}",
      symbols::INFO,
      component,
      truncate_hash(&component.id().to_string()),
      marker
    );
    if component.members().len() > 1 {
      for member in component.members() {
        println!("      {}", member.address);
      }
    }
    for dependency in component.dependencies() {
      println!("      {} {}", symbols::ARROW, dependency);
    }
  }
  println!();
  print_stat("Roots", &coarsened.roots().len().to_string());

  Ok(())
}
