//! Running javac.

use tracing::Level;

use super::classpath::AssembledClasspath;
use super::sources::ComponentSources;
use super::CompileError;
use crate::consts::{CLASSFILES_DIR, JAVAC_MAIN_CLASS};
use crate::graph::Component;
use crate::image::ImageStore;
use crate::process::{FallibleProcessResult, Process, ProcessExecutor};
use crate::toolchain::JdkSetup;

/// The javac command line: JDK prefix, main class, optional `-cp`, `-d` and sorted sources.
pub fn javac_argv(jdk: &JdkSetup, classpath: &AssembledClasspath, sources: &ComponentSources) -> Vec<String> {
  let tools_jar = format!("{}/lib/tools.jar", jdk.java_home.display());
  let mut argv = jdk.args(&[tools_jar]);
  argv.push(JAVAC_MAIN_CLASS.to_string());
  if let Some(classpath) = classpath.arg() {
    argv.push("-cp".to_string());
    argv.push(classpath);
  }
  argv.push("-d".to_string());
  argv.push(CLASSFILES_DIR.to_string());
  argv.extend(sources.sorted_files());
  argv
}

/// Compile `sources` against `classpath`, capturing `classfiles/`.
pub async fn run_javac(
  store: &ImageStore,
  executor: &dyn ProcessExecutor,
  jdk: &JdkSetup,
  component: &Component,
  classpath: &AssembledClasspath,
  sources: &ComponentSources,
) -> Result<FallibleProcessResult, CompileError> {
  let dest_dir = store.create_directories(&[CLASSFILES_DIR])?;
  let mut inputs = vec![
    &classpath.user_digest,
    &classpath.thirdparty_digest,
    &dest_dir,
    &jdk.digest,
  ];
  inputs.extend(sources.digests());
  let input_digest = store.merge(inputs)?;

  let mut process = Process::new(
    javac_argv(jdk, classpath, sources),
    format!("Compile {} with javac", component),
  );
  process.input_digest = input_digest;
  process.env = jdk.env.clone();
  process.output_directories = vec![CLASSFILES_DIR.to_string()];
  process.append_only_caches = jdk.append_only_caches.clone();
  process.use_daemon = jdk.daemon_digest();
  process.level = Level::DEBUG;
  Ok(executor.execute(&process).await?)
}
