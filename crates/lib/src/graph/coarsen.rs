//! Collapsing dependency cycles into components.
//!
//! Targets are nodes and dependencies are edges from dependent to
//! dependency. Each strongly connected component becomes one [`Component`];
//! Tarjan's algorithm yields them in reverse topological order, so every
//! component's dependencies already exist by the time it is built.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use super::{BuildGraph, Component, GraphError};
use crate::target::Address;

/// The component DAG of a build graph.
#[derive(Debug, Clone)]
pub struct CoarsenedGraph {
  /// Dependencies before dependents.
  components: Vec<Arc<Component>>,
  by_address: BTreeMap<Address, usize>,
}

impl CoarsenedGraph {
  /// Components in dependency order.
  pub fn components(&self) -> &[Arc<Component>] {
    &self.components
  }

  /// The component owning `address`.
  pub fn component_for(&self, address: &Address) -> Option<&Arc<Component>> {
    self.by_address.get(address).map(|&index| &self.components[index])
  }

  /// Components no other component depends on, by representative address.
  pub fn roots(&self) -> Vec<Arc<Component>> {
    let depended_on: HashSet<_> = self
      .components
      .iter()
      .flat_map(|c| c.dependencies().iter().map(|d| d.id().clone()))
      .collect();
    let mut roots: Vec<Arc<Component>> = self
      .components
      .iter()
      .filter(|c| !depended_on.contains(c.id()))
      .cloned()
      .collect();
    roots.sort_by(|a, b| a.representative().address.cmp(&b.representative().address));
    roots
  }

  pub fn len(&self) -> usize {
    self.components.len()
  }

  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }
}

/// Compute the components of `graph`.
pub fn coarsen(graph: &BuildGraph) -> Result<CoarsenedGraph, GraphError> {
  let mut dag: DiGraph<&Address, ()> = DiGraph::new();
  let mut nodes: BTreeMap<&Address, NodeIndex> = BTreeMap::new();
  for target in graph.targets() {
    nodes.insert(&target.address, dag.add_node(&target.address));
  }
  for target in graph.targets() {
    let from = nodes[&target.address];
    for dependency in &target.dependencies {
      let to = *nodes.get(dependency).ok_or_else(|| GraphError::UnknownDependency {
        address: target.address.clone(),
        dependency: dependency.clone(),
      })?;
      dag.add_edge(from, to, ());
    }
  }

  let mut components: Vec<Arc<Component>> = Vec::new();
  let mut by_address: BTreeMap<Address, usize> = BTreeMap::new();
  let mut cycles = 0usize;

  for scc in tarjan_scc(&dag) {
    let mut members = Vec::with_capacity(scc.len());
    let mut dependencies = Vec::new();
    for &node in &scc {
      let address = dag[node];
      let target = graph
        .target(address)
        .ok_or_else(|| GraphError::UnknownTarget(address.clone()))?;
      members.push(target.clone());

      for dependency in &target.dependencies {
        if let Some(&index) = by_address.get(dependency) {
          dependencies.push(components[index].clone());
        }
      }
    }

    let component = Arc::new(Component::new(members, dependencies)?);
    if component.is_cycle() {
      cycles += 1;
      debug!(component = %component, members = component.members().len(), "collapsed dependency cycle");
    }

    let index = components.len();
    for member in component.members() {
      by_address.insert(member.address.clone(), index);
    }
    components.push(component);
  }

  info!(targets = graph.len(), components = components.len(), cycles, "coarsened build graph");
  Ok(CoarsenedGraph {
    components,
    by_address,
  })
}
