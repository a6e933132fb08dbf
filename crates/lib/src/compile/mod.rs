//! Component compilation.
//!
//! Compiling a component runs these stages:
//! 1. compile every direct dependency (recursively, memoized) while
//!    collecting the component's own sources
//! 2. short-circuit with `DependencyFailed` if any dependency failed
//! 3. pass dependency outputs straight through if there are no sources
//! 4. assemble the classpath: `__usercp` dependency jars, then
//!    `__thirdpartycp` artifacts from the filtered lockfile
//! 5. run javac into `classfiles/`
//! 6. archive `classfiles/` into `<address>.jar`, unless it is empty

mod classpath;
mod dependencies;
mod invoke;
mod javac;
mod memo;
mod package;
mod sources;
mod types;


pub use classpath::{AssembledClasspath, assemble_classpath, thirdparty_coordinates};
pub use dependencies::{DependencyClasspath, resolve_dependencies};
pub use invoke::{javac_argv, run_javac};
pub use javac::{CompileJavaSourceRequest, JavacCompiler};
pub use memo::CompileMemo;
pub use package::{artifact_file_name, package};
pub use sources::{ComponentSources, collect_sources};
pub use types::{ClasspathEntry, CompileError, CompileResult, FallibleClasspathEntry};
