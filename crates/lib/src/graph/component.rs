//! Coarsened components.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use super::GraphError;
use crate::target::{Address, Target};
use crate::util::hash::{HashError, Hashable, ObjectHash};

/// Identity of a component: a hash of its sorted member addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentId(pub ObjectHash);

impl std::fmt::Display for ComponentId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Serialize)]
struct MemberSpecs<'a> {
  members: Vec<&'a str>,
}

impl Hashable for MemberSpecs<'_> {}

impl ComponentId {
  pub fn for_members<'a>(members: impl IntoIterator<Item = &'a Address>) -> Result<Self, HashError> {
    let specs: Vec<String> = members.into_iter().map(Address::spec).collect();
    let mut members: Vec<&str> = specs.iter().map(String::as_str).collect();
    members.sort_unstable();
    Ok(Self(MemberSpecs { members }.compute_hash()?))
  }
}

/// One or more targets that must be compiled together.
///
/// A component is a strongly connected set of targets; without a cycle it
/// holds a single member. Its dependencies are other components, so the
/// components of a graph always form a DAG.
#[derive(Debug)]
pub struct Component {
  id: ComponentId,
  members: Vec<Target>,
  dependencies: Vec<Arc<Component>>,
}

impl Component {
  /// Members are sorted by address; dependencies are deduplicated and sorted
  /// by their representative address.
  pub fn new(mut members: Vec<Target>, dependencies: Vec<Arc<Component>>) -> Result<Self, GraphError> {
    if members.is_empty() {
      return Err(GraphError::EmptyComponent);
    }
    members.sort_by(|a, b| a.address.cmp(&b.address));
    let id = ComponentId::for_members(members.iter().map(|t| &t.address)).map_err(GraphError::Hash)?;

    let unique: BTreeMap<Address, Arc<Component>> = dependencies
      .into_iter()
      .filter(|dep| dep.id != id)
      .map(|dep| (dep.representative().address.clone(), dep))
      .collect();

    Ok(Self {
      id,
      members,
      dependencies: unique.into_values().collect(),
    })
  }

  pub fn id(&self) -> &ComponentId {
    &self.id
  }

  pub fn members(&self) -> &[Target] {
    &self.members
  }

  pub fn dependencies(&self) -> &[Arc<Component>] {
    &self.dependencies
  }

  /// The member with the smallest address, used to name outputs.
  pub fn representative(&self) -> &Target {
    &self.members[0]
  }

  /// Whether this component collapses a dependency cycle.
  pub fn is_cycle(&self) -> bool {
    self.members.len() > 1 || self.members.iter().any(|t| t.dependencies.contains(&t.address))
  }

  /// Every component reachable through dependencies, excluding this one,
  /// ordered by representative address.
  pub fn dependency_closure(&self) -> Vec<Arc<Component>> {
    let mut seen = HashSet::new();
    let mut closure = BTreeMap::new();
    let mut stack: Vec<&Arc<Component>> = self.dependencies.iter().collect();
    while let Some(component) = stack.pop() {
      if !seen.insert(component.id.clone()) {
        continue;
      }
      closure.insert(component.representative().address.clone(), component.clone());
      stack.extend(component.dependencies.iter());
    }
    closure.into_values().collect()
  }
}

impl PartialEq for Component {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for Component {}

impl std::hash::Hash for Component {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl std::fmt::Display for Component {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.representative().address)?;
    if self.members.len() > 1 {
      write!(f, " and {} other", self.members.len() - 1)?;
      if self.members.len() > 2 {
        f.write_str("s")?;
      }
    }
    Ok(())
  }
}
