//! Immutable, content-addressed filesystem images.
//!
//! An [`Image`] is an in-memory snapshot of a directory tree: an ordered map
//! from relative path to either a file or a directory. Images are identified
//! by their [`Digest`], computed over a canonical listing of their entries, so
//! two images with identical contents always share a digest regardless of how
//! they were assembled.
//!
//! Pipeline stages never mutate images. They are stored once in an
//! [`ImageStore`] and passed around by digest.

pub mod disk;
pub mod store;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::{ContentHash, RecordHasher, hash_bytes};

pub use store::ImageStore;

/// Fingerprint of the image with no entries (SHA256 of empty input).
pub const EMPTY_FINGERPRINT: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Errors produced while building, combining or moving images.
#[derive(Debug, Error)]
pub enum ImageError {
  #[error("invalid image path '{path}': {reason}")]
  InvalidPath { path: String, reason: &'static str },

  #[error("conflicting contents for '{path}' while merging images")]
  MergeConflict { path: String },

  #[error("unknown image digest {0}")]
  UnknownDigest(Digest),

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to walk {path}: {message}")]
  Walk { path: PathBuf, message: String },
}

/// Identity of an image: fingerprint of its entry listing plus total file size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
  pub fingerprint: ContentHash,
  pub size: u64,
}

impl Digest {
  /// Digest of the canonical empty image.
  pub fn empty() -> Self {
    Self {
      fingerprint: ContentHash(EMPTY_FINGERPRINT.to_string()),
      size: 0,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.size == 0 && self.fingerprint.0 == EMPTY_FINGERPRINT
  }
}

impl std::fmt::Display for Digest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.fingerprint, self.size)
  }
}

/// Contents of a single file in an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
  pub bytes: Arc<[u8]>,
  pub is_executable: bool,
}

impl FileContent {
  pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
    Self {
      bytes: bytes.into(),
      is_executable: false,
    }
  }

  pub fn executable(bytes: impl Into<Arc<[u8]>>) -> Self {
    Self {
      bytes: bytes.into(),
      is_executable: true,
    }
  }
}

/// An entry in an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
  File(FileContent),
  Directory,
}

/// An immutable directory tree.
///
/// Paths are relative, `/`-separated and normalized. Parent directories of
/// every file are recorded as explicit directory entries, so the listing is
/// canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
  entries: BTreeMap<String, Entry>,
}

/// Sorted listing of an image, paired with its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
  pub digest: Digest,
  pub files: Vec<String>,
  pub dirs: Vec<String>,
}

impl Image {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a file, creating parent directory entries as needed.
  pub fn insert_file(&mut self, path: &str, content: FileContent) -> Result<(), ImageError> {
    let path = normalize_path(path)?;
    self.insert_parents(&path)?;
    self.insert_entry(path, Entry::File(content))
  }

  /// Add an (empty) directory and its parents.
  pub fn insert_dir(&mut self, path: &str) -> Result<(), ImageError> {
    let path = normalize_path(path)?;
    self.insert_parents(&path)?;
    self.insert_entry(path, Entry::Directory)
  }

  pub fn with_file(mut self, path: &str, bytes: impl Into<Arc<[u8]>>) -> Result<Self, ImageError> {
    self.insert_file(path, FileContent::new(bytes))?;
    Ok(self)
  }

  fn insert_parents(&mut self, path: &str) -> Result<(), ImageError> {
    let mut end = 0;
    while let Some(offset) = path[end..].find('/') {
      end += offset;
      self.insert_entry(path[..end].to_string(), Entry::Directory)?;
      end += 1;
    }
    Ok(())
  }

  fn insert_entry(&mut self, path: String, entry: Entry) -> Result<(), ImageError> {
    match self.entries.get(&path) {
      Some(existing) if *existing != entry => Err(ImageError::MergeConflict { path }),
      Some(_) => Ok(()),
      None => {
        self.entries.insert(path, entry);
        Ok(())
      }
    }
  }

  pub fn get(&self, path: &str) -> Option<&Entry> {
    self.entries.get(path)
  }

  pub fn file(&self, path: &str) -> Option<&FileContent> {
    match self.entries.get(path) {
      Some(Entry::File(content)) => Some(content),
      _ => None,
    }
  }

  pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
    self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
  }

  /// Files in lexicographic path order.
  pub fn files(&self) -> impl Iterator<Item = (&str, &FileContent)> {
    self.entries.iter().filter_map(|(path, entry)| match entry {
      Entry::File(content) => Some((path.as_str(), content)),
      Entry::Directory => None,
    })
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Merge `other` into this image.
  ///
  /// Identical entries at the same path are fine; differing ones are a conflict.
  pub fn merge(&mut self, other: &Image) -> Result<(), ImageError> {
    for (path, entry) in &other.entries {
      self.insert_entry(path.clone(), entry.clone())?;
    }
    Ok(())
  }

  /// A copy of this image with every path nested under `prefix`.
  ///
  /// The empty image stays empty.
  pub fn with_prefix(&self, prefix: &str) -> Result<Image, ImageError> {
    let prefix = normalize_path(prefix)?;
    if self.is_empty() {
      return Ok(Image::new());
    }
    let mut prefixed = Image::new();
    prefixed.insert_dir(&prefix)?;
    for (path, entry) in &self.entries {
      prefixed.entries.insert(format!("{}/{}", prefix, path), entry.clone());
    }
    Ok(prefixed)
  }

  /// Compute the digest of this image.
  ///
  /// Entries are listed in path order as `D:<path>` or `F:<path>:<x|->:<sha256>`.
  pub fn digest(&self) -> Digest {
    let mut hasher = RecordHasher::new();
    let mut size = 0u64;
    for (path, entry) in &self.entries {
      match entry {
        Entry::Directory => hasher.record(&format!("D:{}", path)),
        Entry::File(content) => {
          let mode = if content.is_executable { "x" } else { "-" };
          let content_hash = hash_bytes(&content.bytes);
          hasher.record(&format!("F:{}:{}:{}", path, mode, content_hash.0));
          size += content.bytes.len() as u64;
        }
      }
    }
    Digest {
      fingerprint: hasher.finish(),
      size,
    }
  }

  pub fn snapshot(&self) -> Snapshot {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for (path, entry) in &self.entries {
      match entry {
        Entry::File(_) => files.push(path.clone()),
        Entry::Directory => dirs.push(path.clone()),
      }
    }
    Snapshot {
      digest: self.digest(),
      files,
      dirs,
    }
  }
}

/// Validate and normalize a relative image path.
pub fn normalize_path(path: &str) -> Result<String, ImageError> {
  let invalid = |reason| ImageError::InvalidPath {
    path: path.to_string(),
    reason,
  };

  if path.starts_with('/') {
    return Err(invalid("must be relative"));
  }

  let mut segments = Vec::new();
  for segment in path.split('/') {
    match segment {
      "" | "." => continue,
      ".." => return Err(invalid("must not contain '..'")),
      s if s.contains('\\') => return Err(invalid("must use '/' separators")),
      s => segments.push(s),
    }
  }

  if segments.is_empty() {
    return Err(invalid("must not be empty"));
  }
  Ok(segments.join("/"))
}
