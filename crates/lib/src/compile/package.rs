//! Packaging compiler output.

use tracing::debug;

use super::CompileError;
use crate::archive::Archiver;
use crate::consts::CLASSFILES_DIR;
use crate::graph::Component;
use crate::image::{Digest, ImageStore};

/// Jar name for a component, derived from its representative's address.
pub fn artifact_file_name(component: &Component) -> String {
  format!("{}.jar", component.representative().address.path_safe_spec())
}

/// Archive `classfiles/` of `output` into the component's jar.
///
/// Output without any files (a lone `package-info.java`, say) packages to
/// the empty image.
pub async fn package(
  store: &ImageStore,
  archiver: &dyn Archiver,
  component: &Component,
  output: &Digest,
) -> Result<Digest, CompileError> {
  let snapshot = store.snapshot(output)?;
  if snapshot.files.is_empty() {
    debug!(component = %component, "compiler produced no class files, skipping jar");
    return Ok(Digest::empty());
  }

  let file_name = artifact_file_name(component);
  Ok(archiver.archive(output, CLASSFILES_DIR, &file_name).await?)
}
