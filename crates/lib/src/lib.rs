//! kiln-lib: compilation of coarsened Java components.
//!
//! This crate turns nodes of a source dependency graph into content-addressed
//! classpath artifacts:
//! - `graph`: build graph loading and coarsening of cycles into components
//! - `compile`: the memoized compile pipeline for a single component
//! - `execute`: compiling a set of requested targets and reporting results
//! - `image`: immutable, content-addressed filesystem images
//!
//! Everything the pipeline talks to (sources, lockfiles, processes, archiving)
//! sits behind a trait so it can be swapped out.

pub mod archive;
pub mod compile;
pub mod config;
pub mod consts;
pub mod execute;
pub mod graph;
pub mod image;
pub mod process;
pub mod resolve;
pub mod sources;
pub mod target;
pub mod toolchain;
pub mod util;
