//! Packaging compiled output into jars.
//!
//! Archives are reproducible: entries are written in path order with a fixed
//! timestamp (1980-01-01, the zip epoch) and fixed permissions, so the same
//! input image always yields byte-identical jars.

use std::io::{Cursor, Write};

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::image::{Digest, Entry, FileContent, Image, ImageError, ImageStore};

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("directory '{0}' is not present in the archive input")]
  MissingDirectory(String),

  #[error("failed to write archive: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("failed to write archive entry: {0}")]
  Io(#[from] std::io::Error),

  #[error("archive task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error(transparent)]
  Image(#[from] ImageError),
}

/// Turns one directory of an image into a single archive file.
pub trait Archiver: Send + Sync {
  /// Archive the contents of `directory` in `input` as `output_file`.
  ///
  /// Entry names are relative to `directory`. The result image holds only
  /// `output_file`.
  fn archive<'a>(
    &'a self,
    input: &'a Digest,
    directory: &'a str,
    output_file: &'a str,
  ) -> BoxFuture<'a, Result<Digest, ArchiveError>>;
}

/// In-process zip writer.
#[derive(Debug, Clone)]
pub struct ZipArchiver {
  store: ImageStore,
}

impl ZipArchiver {
  pub fn new(store: ImageStore) -> Self {
    Self { store }
  }

  async fn write(&self, input: &Digest, directory: &str, output_file: &str) -> Result<Digest, ArchiveError> {
    let image = self.store.get(input)?;
    if !matches!(image.get(directory), Some(Entry::Directory)) {
      return Err(ArchiveError::MissingDirectory(directory.to_string()));
    }

    let prefix = format!("{}/", directory);
    let entries: Vec<(String, Entry)> = image
      .entries()
      .filter_map(|(path, entry)| path.strip_prefix(&prefix).map(|rel| (rel.to_string(), entry.clone())))
      .collect();
    let count = entries.len();

    let bytes = tokio::task::spawn_blocking(move || write_zip(entries)).await??;

    let mut output = Image::new();
    output.insert_file(output_file, FileContent::new(bytes))?;
    let digest = self.store.put(output);
    debug!(output_file, entries = count, digest = %digest, "wrote archive");
    Ok(digest)
  }
}

impl Archiver for ZipArchiver {
  fn archive<'a>(
    &'a self,
    input: &'a Digest,
    directory: &'a str,
    output_file: &'a str,
  ) -> BoxFuture<'a, Result<Digest, ArchiveError>> {
    self.write(input, directory, output_file).boxed()
  }
}

/// Write `entries` (already in path order) to an in-memory zip.
fn write_zip(entries: Vec<(String, Entry)>) -> Result<Vec<u8>, ArchiveError> {
  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .last_modified_time(DateTime::default())
    .unix_permissions(0o644);
  let dir_options = options.unix_permissions(0o755);

  let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
  for (name, entry) in entries {
    match entry {
      Entry::Directory => writer.add_directory(format!("{}/", name), dir_options)?,
      Entry::File(content) => {
        writer.start_file(name, options)?;
        writer.write_all(&content.bytes)?;
      }
    }
  }
  Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Read;
  use zip::ZipArchive;

  fn compiled(store: &ImageStore) -> Digest {
    let image = Image::new()
      .with_file("classfiles/com/example/B.class", b"B".to_vec())
      .unwrap()
      .with_file("classfiles/com/example/A.class", b"A".to_vec())
      .unwrap();
    store.put(image)
  }

  fn jar_bytes(store: &ImageStore, digest: &Digest, name: &str) -> Vec<u8> {
    store.get(digest).unwrap().file(name).unwrap().bytes.to_vec()
  }

  #[tokio::test]
  async fn archive_contains_directory_contents_in_order() {
    let store = ImageStore::new();
    let archiver = ZipArchiver::new(store.clone());
    let input = compiled(&store);

    let output = archiver.archive(&input, "classfiles", "lib.jar").await.unwrap();
    assert_eq!(store.snapshot(&output).unwrap().files, vec!["lib.jar"]);

    let bytes = jar_bytes(&store, &output, "lib.jar");
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names.len(), 4);
    assert!(sorted.contains(&"com/example/A.class".to_string()));

    let mut content = String::new();
    archive
      .by_name("com/example/B.class")
      .unwrap()
      .read_to_string(&mut content)
      .unwrap();
    assert_eq!(content, "B");
  }

  #[tokio::test]
  async fn archives_are_byte_identical() {
    let store = ImageStore::new();
    let archiver = ZipArchiver::new(store.clone());
    let input = compiled(&store);

    let first = archiver.archive(&input, "classfiles", "lib.jar").await.unwrap();
    let second = ZipArchiver::new(store.clone())
      .archive(&input, "classfiles", "lib.jar")
      .await
      .unwrap();
    assert_eq!(first, second);
  }

  #[tokio::test]
  async fn missing_directory_is_an_error() {
    let store = ImageStore::new();
    let archiver = ZipArchiver::new(store.clone());
    let input = compiled(&store);

    let result = archiver.archive(&input, "nope", "lib.jar").await;
    assert!(matches!(result, Err(ArchiveError::MissingDirectory(_))));
  }
}
