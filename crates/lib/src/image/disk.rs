//! Moving images between the store and the filesystem.
//!
//! `materialize` writes an image into a directory (a process sandbox or a
//! dist directory). `capture` reads declared outputs back into an image.

use std::path::Path;

use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use super::{Entry, FileContent, Image, ImageError};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ImageError + '_ {
  move |source| ImageError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// Write every entry of `image` below `root`.
pub async fn materialize(image: &Image, root: &Path) -> Result<(), ImageError> {
  fs::create_dir_all(root).await.map_err(io_error(root))?;

  for (rel_path, entry) in image.entries() {
    let path = root.join(rel_path);
    match entry {
      Entry::Directory => fs::create_dir_all(&path).await.map_err(io_error(&path))?,
      Entry::File(content) => {
        if let Some(parent) = path.parent() {
          fs::create_dir_all(parent).await.map_err(io_error(parent))?;
        }
        fs::write(&path, &content.bytes).await.map_err(io_error(&path))?;
        if content.is_executable {
          set_executable(&path).await?;
        }
      }
    }
  }

  debug!(root = ?root, entries = image.entries().count(), "materialized image");
  Ok(())
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> Result<(), ImageError> {
  use std::os::unix::fs::PermissionsExt;

  fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
    .await
    .map_err(io_error(path))
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> Result<(), ImageError> {
  Ok(())
}

/// Capture declared outputs below `root` into an image.
///
/// Output directories are captured recursively (an existing empty directory is
/// kept as an empty directory entry); output files are captured individually.
/// Declared outputs that do not exist are skipped.
pub fn capture(root: &Path, output_directories: &[String], output_files: &[String]) -> Result<Image, ImageError> {
  let mut image = Image::new();

  for dir in output_directories {
    let dir_path = root.join(dir);
    if !dir_path.is_dir() {
      continue;
    }

    for entry in WalkDir::new(&dir_path).sort_by_file_name().follow_links(true) {
      let entry = entry.map_err(|e| ImageError::Walk {
        path: dir_path.clone(),
        message: e.to_string(),
      })?;
      let rel_path = relative_path(root, entry.path())?;
      let file_type = entry.file_type();
      if file_type.is_dir() {
        image.insert_dir(&rel_path)?;
      } else if file_type.is_file() {
        image.insert_file(&rel_path, read_file(entry.path())?)?;
      }
    }
  }

  for file in output_files {
    let file_path = root.join(file);
    if file_path.is_file() {
      image.insert_file(file, read_file(&file_path)?)?;
    }
  }

  Ok(image)
}

fn read_file(path: &Path) -> Result<FileContent, ImageError> {
  let bytes = std::fs::read(path).map_err(io_error(path))?;
  let is_executable = is_executable(path)?;
  Ok(FileContent {
    bytes: bytes.into(),
    is_executable,
  })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> Result<bool, ImageError> {
  use std::os::unix::fs::PermissionsExt;

  let metadata = std::fs::metadata(path).map_err(io_error(path))?;
  Ok(metadata.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> Result<bool, ImageError> {
  Ok(false)
}

fn relative_path(root: &Path, path: &Path) -> Result<String, ImageError> {
  let rel = path.strip_prefix(root).unwrap_or(path);
  let mut segments = Vec::new();
  for component in rel.components() {
    let segment = component.as_os_str().to_str().ok_or_else(|| ImageError::InvalidPath {
      path: rel.display().to_string(),
      reason: "not valid UTF-8",
    })?;
    segments.push(segment);
  }
  Ok(segments.join("/"))
}
