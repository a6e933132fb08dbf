//! Target addresses.
//!
//! An address names a target by the directory that declares it and a target
//! name: `src/java/org/example:lib`. When the name is omitted it defaults to
//! the last directory segment, so `src/java/org/example` is
//! `src/java/org/example:example`. Root-level targets are written `//:name`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
  #[error("empty address")]
  Empty,

  #[error("invalid address '{spec}': {reason}")]
  Invalid { spec: String, reason: &'static str },
}

/// The address of a single target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
  spec_path: String,
  target_name: String,
}

impl Address {
  pub fn new(spec_path: &str, target_name: &str) -> Result<Self, AddressError> {
    let spec_path = spec_path.trim_start_matches("//").trim_matches('/');
    let invalid = |reason| AddressError::Invalid {
      spec: format!("{}:{}", spec_path, target_name),
      reason,
    };

    if target_name.is_empty() {
      return Err(invalid("target name must not be empty"));
    }
    if target_name.contains('/') || target_name.contains(':') {
      return Err(invalid("target name must not contain '/' or ':'"));
    }
    if spec_path.contains(':') {
      return Err(invalid("path must not contain ':'"));
    }
    if spec_path.split('/').any(|segment| segment == "..") {
      return Err(invalid("path must not contain '..'"));
    }

    Ok(Self {
      spec_path: spec_path.to_string(),
      target_name: target_name.to_string(),
    })
  }

  /// Parse `path/to:name`, `path/to` or `//:name`.
  pub fn parse(spec: &str) -> Result<Self, AddressError> {
    let spec = spec.trim();
    if spec.is_empty() {
      return Err(AddressError::Empty);
    }

    match spec.rsplit_once(':') {
      Some((path, name)) => Self::new(path, name),
      None => {
        let path = spec.trim_start_matches("//").trim_matches('/');
        let name = path.rsplit('/').next().unwrap_or_default();
        Self::new(path, name)
      }
    }
  }

  pub fn spec_path(&self) -> &str {
    &self.spec_path
  }

  pub fn target_name(&self) -> &str {
    &self.target_name
  }

  /// Canonical string form.
  pub fn spec(&self) -> String {
    if self.spec_path.is_empty() {
      format!("//:{}", self.target_name)
    } else {
      format!("{}:{}", self.spec_path, self.target_name)
    }
  }

  /// A filesystem-safe encoding of the address, used to name artifacts.
  ///
  /// Path separators and the name separator become `.`; anything outside
  /// `[A-Za-z0-9._-]` becomes `_`.
  pub fn path_safe_spec(&self) -> String {
    let joined = if self.spec_path.is_empty() {
      self.target_name.clone()
    } else {
      format!("{}.{}", self.spec_path.replace('/', "."), self.target_name)
    };
    joined
      .chars()
      .map(|c| {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
          c
        } else {
          '_'
        }
      })
      .collect()
  }
}

impl std::fmt::Display for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.spec())
  }
}

impl TryFrom<String> for Address {
  type Error = AddressError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<Address> for String {
  fn from(address: Address) -> Self {
    address.spec()
  }
}
