//! Classpath assembly.
//!
//! The compiler classpath lists first-party dependency outputs (nested under
//! `__usercp`) before third-party artifacts (under `__thirdpartycp`).
//! Compilers resolve duplicate class names by classpath precedence, so this
//! order is fixed regardless of which half finishes first.

use tracing::debug;

use super::{ClasspathEntry, CompileError};
use crate::consts::{CLASSPATH_SEPARATOR, THIRDPARTY_CLASSPATH_PREFIX, USER_CLASSPATH_PREFIX};
use crate::graph::Component;
use crate::image::{Digest, ImageStore};
use crate::resolve::{Coordinates, LockfileResolver, MaterializedClasspath, ResolveKey, materialize_classpath};

/// The classpath of one compilation and the images backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledClasspath {
  /// Relative paths, first-party before third-party.
  pub entries: Vec<String>,
  pub user_digest: Digest,
  pub thirdparty_digest: Digest,
}

impl AssembledClasspath {
  /// The `-cp` value, or `None` when there is nothing on the classpath.
  pub fn arg(&self) -> Option<String> {
    if self.entries.is_empty() {
      None
    } else {
      Some(self.entries.join(CLASSPATH_SEPARATOR))
    }
  }
}

/// Coordinates of every artifact target in the component's dependency closure.
pub fn thirdparty_coordinates(component: &Component) -> Coordinates {
  component
    .dependency_closure()
    .iter()
    .flat_map(|dependency| dependency.members().iter())
    .filter_map(|target| target.coordinate().cloned())
    .collect()
}

async fn thirdparty_classpath(
  store: &ImageStore,
  resolver: &dyn LockfileResolver,
  component: &Component,
  resolve: &ResolveKey,
) -> Result<MaterializedClasspath, CompileError> {
  let coordinates = thirdparty_coordinates(component);
  if coordinates.is_empty() {
    return Ok(MaterializedClasspath::empty(THIRDPARTY_CLASSPATH_PREFIX));
  }

  let unfiltered = resolver.resolve(resolve).await?;
  let lockfile = unfiltered.filter(&coordinates)?;
  debug!(
    component = %component,
    requested = coordinates.len(),
    artifacts = lockfile.entries.len(),
    "filtered lockfile"
  );
  Ok(materialize_classpath(store, resolver, &lockfile, THIRDPARTY_CLASSPATH_PREFIX).await?)
}

/// Build the classpath for `component` from its dependencies' outputs.
pub async fn assemble_classpath(
  store: &ImageStore,
  resolver: &dyn LockfileResolver,
  component: &Component,
  resolve: &ResolveKey,
  dependencies: &[ClasspathEntry],
) -> Result<AssembledClasspath, CompileError> {
  let user = async {
    let merged = store.merge(dependencies.iter().map(|entry| &entry.digest))?;
    let prefixed = store.add_prefix(&merged, USER_CLASSPATH_PREFIX)?;
    Ok::<_, CompileError>(store.snapshot(&prefixed)?)
  };
  let (user, thirdparty) = tokio::try_join!(user, thirdparty_classpath(store, resolver, component, resolve))?;

  let mut entries = user.files;
  entries.extend(thirdparty.classpath_entries());
  debug!(component = %component, entries = entries.len(), "assembled classpath");

  Ok(AssembledClasspath {
    entries,
    user_digest: user.digest,
    thirdparty_digest: thirdparty.digest,
  })
}
