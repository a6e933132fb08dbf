//! CLI integration tests.

mod common;
mod compile_tests;
mod graph_tests;
