//! In-memory content-addressed image store.
//!
//! Images are stored once by digest and shared by `Arc`. Storing an image that
//! is already present is a no-op, so identical outputs of different stages
//! collapse onto the same entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use super::{Digest, Image, ImageError, Snapshot};

/// Shared handle to the image store. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ImageStore {
  images: Arc<Mutex<HashMap<Digest, Arc<Image>>>>,
}

impl Default for ImageStore {
  fn default() -> Self {
    Self::new()
  }
}

impl ImageStore {
  /// Create a store that already contains the empty image.
  pub fn new() -> Self {
    let mut images = HashMap::new();
    images.insert(Digest::empty(), Arc::new(Image::new()));
    Self {
      images: Arc::new(Mutex::new(images)),
    }
  }

  /// Store an image and return its digest.
  pub fn put(&self, image: Image) -> Digest {
    let digest = image.digest();
    let mut images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
    images.entry(digest.clone()).or_insert_with(|| {
      trace!(digest = %digest, "storing image");
      Arc::new(image)
    });
    digest
  }

  pub fn get(&self, digest: &Digest) -> Result<Arc<Image>, ImageError> {
    let images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
    images
      .get(digest)
      .cloned()
      .ok_or_else(|| ImageError::UnknownDigest(digest.clone()))
  }

  pub fn snapshot(&self, digest: &Digest) -> Result<Snapshot, ImageError> {
    Ok(self.get(digest)?.snapshot())
  }

  /// Merge several images into one.
  ///
  /// The result does not depend on the order of `digests`: identical entries
  /// collapse and conflicting entries are an error either way.
  pub fn merge<'a>(&self, digests: impl IntoIterator<Item = &'a Digest>) -> Result<Digest, ImageError> {
    let mut digests: Vec<&Digest> = digests.into_iter().filter(|d| !d.is_empty()).collect();
    digests.dedup();
    match digests.as_slice() {
      [] => return Ok(Digest::empty()),
      [single] => {
        self.get(single)?;
        return Ok((*single).clone());
      }
      _ => {}
    }

    let mut merged = Image::new();
    for digest in digests {
      merged.merge(self.get(digest)?.as_ref())?;
    }
    Ok(self.put(merged))
  }

  /// Nest an image under `prefix`.
  pub fn add_prefix(&self, digest: &Digest, prefix: &str) -> Result<Digest, ImageError> {
    let image = self.get(digest)?;
    Ok(self.put(image.with_prefix(prefix)?))
  }

  /// Create an image containing only the given empty directories.
  pub fn create_directories(&self, dirs: &[&str]) -> Result<Digest, ImageError> {
    let mut image = Image::new();
    for dir in dirs {
      image.insert_dir(dir)?;
    }
    Ok(self.put(image))
  }

  pub fn len(&self) -> usize {
    let images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
    images.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
