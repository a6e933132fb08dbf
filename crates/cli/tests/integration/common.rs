//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// A javac stand-in for `$JAVA_HOME/bin/java`.
///
/// Runs with an empty `PATH`, so it sticks to shell builtins. Each source
/// becomes `classfiles/<stem>.class`; a source containing `COMPILE_ERROR`
/// fails the run.
const FAKE_JAVA: &str = r#"#!/bin/sh
out=""
status=0
sources=""
while [ $# -gt 0 ]; do
  case "$1" in
    -cp) shift 2 ;;
    -d) out="$2"; shift 2 ;;
    com.sun.tools.javac.Main) shift ;;
    *) sources="$sources $1"; shift ;;
  esac
done
for src in $sources; do
  broken=0
  while IFS= read -r line || [ -n "$line" ]; do
    case "$line" in
      *COMPILE_ERROR*) broken=1 ;;
    esac
  done < "$src"
  if [ "$broken" = 1 ]; then
    printf '%s:1: error: cannot find symbol COMPILE_ERROR\n' "$src" >&2
    status=1
    continue
  fi
  name="${src##*/}"
  printf 'compiled from %s\n' "$src" > "$out/${name%.java}.class"
done
exit $status
"#;

/// Isolated workspace with a build graph, sources and a fake JDK.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Write a file relative to the workspace.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.path(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn write_graph(&self, content: &str) {
    self.write_file("BUILD.json", content);
  }

  /// Install the fake JDK and return its home.
  #[cfg(unix)]
  pub fn fake_jdk(&self) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    self.write_file("jdk/bin/java", FAKE_JAVA);
    let java = self.path("jdk/bin/java");
    std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
    self.path("jdk")
  }

  /// A command for the kiln binary, run from the workspace root.
  ///
  /// The JDK and cache locations come only from this environment.
  pub fn kiln_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("kiln");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("JAVA_HOME");
    cmd.env_remove("KILN_JAVA_HOME");
    cmd.env_remove("KILN_ARTIFACT_REPO");
    cmd.env_remove("RUST_LOG");
    cmd.env("KILN_CACHE_DIR", self.path("cache"));
    cmd
  }
}
