//! Lay out third-party artifacts as a classpath image.

use futures::future::try_join_all;
use tracing::debug;

use super::{LockfileError, LockfileResolver, ResolvedLockfile};
use crate::image::{Digest, FileContent, Image, ImageStore};

/// The artifacts of a lockfile, stored under a common prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedClasspath {
  pub digest: Digest,
  pub prefix: String,
  /// Artifact file names in lockfile order.
  pub file_names: Vec<String>,
}

impl MaterializedClasspath {
  pub fn empty(prefix: &str) -> Self {
    Self {
      digest: Digest::empty(),
      prefix: prefix.to_string(),
      file_names: Vec::new(),
    }
  }

  /// Relative classpath entries, in lockfile order.
  pub fn classpath_entries(&self) -> impl Iterator<Item = String> + '_ {
    self
      .file_names
      .iter()
      .map(move |name| format!("{}/{}", self.prefix, name))
  }
}

/// Fetch every artifact of `lockfile` and store them under `prefix`.
pub async fn materialize_classpath(
  store: &ImageStore,
  resolver: &dyn LockfileResolver,
  lockfile: &ResolvedLockfile,
  prefix: &str,
) -> Result<MaterializedClasspath, LockfileError> {
  if lockfile.entries.is_empty() {
    return Ok(MaterializedClasspath::empty(prefix));
  }

  let contents = try_join_all(lockfile.entries.iter().map(|entry| resolver.fetch(entry))).await?;

  let mut image = Image::new();
  let mut file_names = Vec::with_capacity(lockfile.entries.len());
  for (entry, bytes) in lockfile.entries.iter().zip(contents) {
    image.insert_file(&format!("{}/{}", prefix, entry.file_name), FileContent::new(bytes))?;
    file_names.push(entry.file_name.clone());
  }

  let digest = store.put(image);
  debug!(prefix, artifacts = file_names.len(), digest = %digest, "materialized classpath");
  Ok(MaterializedClasspath {
    digest,
    prefix: prefix.to_string(),
    file_names,
  })
}
