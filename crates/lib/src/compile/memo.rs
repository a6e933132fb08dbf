//! Per-request memoization of compile results.
//!
//! Each (component, resolve) pair owns a `OnceCell`. The first caller runs
//! the compilation; concurrent callers await the same cell and receive the
//! same outcome, errors included. A failed cell is evicted once settled so a
//! later request retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::trace;

use super::{CompileError, FallibleClasspathEntry};
use crate::graph::ComponentId;
use crate::resolve::ResolveKey;

type MemoKey = (ComponentId, ResolveKey);
type Outcome = Result<FallibleClasspathEntry, Arc<CompileError>>;

#[derive(Debug, Default)]
pub struct CompileMemo {
  cells: Mutex<HashMap<MemoKey, Arc<OnceCell<Outcome>>>>,
}

impl CompileMemo {
  pub fn new() -> Self {
    Self::default()
  }

  fn cell(&self, component: &ComponentId, resolve: &ResolveKey) -> Arc<OnceCell<Outcome>> {
    let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
    cells
      .entry((component.clone(), resolve.clone()))
      .or_insert_with(|| Arc::new(OnceCell::new()))
      .clone()
  }

  /// Return the memoized result, computing it with `compute` if needed.
  pub async fn get_or_try_compute<F, Fut>(
    &self,
    component: &ComponentId,
    resolve: &ResolveKey,
    compute: F,
  ) -> Result<FallibleClasspathEntry, CompileError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<FallibleClasspathEntry, CompileError>>,
  {
    let cell = self.cell(component, resolve);
    if let Some(Ok(entry)) = cell.get() {
      trace!(component = %component, resolve = %resolve.name, "memo hit");
      return Ok(entry.clone());
    }
    let outcome = cell
      .get_or_init(|| async move { compute().await.map_err(CompileError::into_shared) })
      .await;
    match outcome {
      Ok(entry) => Ok(entry.clone()),
      Err(error) => {
        self.evict(component, resolve, &cell);
        Err(CompileError::Shared(error.clone()))
      }
    }
  }

  fn evict(&self, component: &ComponentId, resolve: &ResolveKey, cell: &Arc<OnceCell<Outcome>>) {
    let key = (component.clone(), resolve.clone());
    let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
    if cells.get(&key).is_some_and(|current| Arc::ptr_eq(current, cell)) {
      trace!(component = %component, resolve = %resolve.name, "evicting failed compile");
      cells.remove(&key);
    }
  }

  pub fn get(&self, component: &ComponentId, resolve: &ResolveKey) -> Option<FallibleClasspathEntry> {
    let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
    cells
      .get(&(component.clone(), resolve.clone()))
      .and_then(|cell| cell.get().and_then(|outcome| outcome.as_ref().ok()).cloned())
  }

  /// Every completed result for `resolve`.
  pub fn completed(&self, resolve: &ResolveKey) -> Vec<FallibleClasspathEntry> {
    let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
    cells
      .iter()
      .filter(|((_, key), _)| key == resolve)
      .filter_map(|(_, cell)| cell.get().and_then(|outcome| outcome.as_ref().ok()).cloned())
      .collect()
  }
}
