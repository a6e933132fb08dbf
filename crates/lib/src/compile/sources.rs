//! Collecting the sources of a component's members.

use futures::future::try_join_all;

use crate::graph::Component;
use crate::image::Digest;
use crate::sources::{SourceError, SourceFiles, SourceProvider};
use crate::target::Address;

/// Members that contribute at least one source file, in address order.
#[derive(Debug, Clone, Default)]
pub struct ComponentSources {
  members: Vec<(Address, SourceFiles)>,
}

impl ComponentSources {
  /// True when no member contributes files, making the component an alias.
  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }

  pub fn members(&self) -> impl Iterator<Item = &Address> {
    self.members.iter().map(|(address, _)| address)
  }

  /// All source files across members, sorted.
  pub fn sorted_files(&self) -> Vec<String> {
    let mut files: Vec<String> = self
      .members
      .iter()
      .flat_map(|(_, sources)| sources.snapshot.files.iter().cloned())
      .collect();
    files.sort();
    files.dedup();
    files
  }

  pub fn digests(&self) -> impl Iterator<Item = &Digest> {
    self.members.iter().map(|(_, sources)| &sources.snapshot.digest)
  }
}

/// Fetch the sources of every member that declares a sources field.
pub async fn collect_sources(
  provider: &dyn SourceProvider,
  component: &Component,
) -> Result<ComponentSources, SourceError> {
  let with_sources: Vec<_> = component.members().iter().filter(|t| t.sources().is_some()).collect();
  let collected = try_join_all(with_sources.iter().map(|target| provider.source_files(target))).await?;

  let members = with_sources
    .into_iter()
    .zip(collected)
    .filter(|(_, sources)| !sources.is_empty())
    .map(|(target, sources)| (target.address.clone(), sources))
    .collect();
  Ok(ComponentSources { members })
}
