//! Compile command integration tests.
//!
//! These run the real local process executor against a fake JDK.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

const GRAPH: &str = r#"{
  "targets": [
    { "address": "src/util", "kind": "java_sources", "sources": ["src/util"] },
    { "address": "src/app", "kind": "java_sources", "sources": ["src/app"], "dependencies": ["src/util"] },
    { "address": "src/cycle/a", "kind": "java_sources", "sources": ["src/cycle/a"], "dependencies": ["src/cycle/b"] },
    { "address": "src/cycle/b", "kind": "java_sources", "sources": ["src/cycle/b"], "dependencies": ["src/cycle/a"] },
    { "address": "src:all", "kind": "alias", "dependencies": ["src/app", "src/cycle/a"] }
  ]
}"#;

fn workspace() -> TestEnv {
  let env = TestEnv::new();
  env.write_graph(GRAPH);
  env.write_file("src/util/Util.java", "package util;\npublic class Util {}\n");
  env.write_file("src/app/App.java", "package app;\npublic class App {}\n");
  env.write_file("src/cycle/a/A.java", "package cycle;\nclass A { B b; }\n");
  env.write_file("src/cycle/b/B.java", "package cycle;\nclass B { A a; }\n");
  env
}

fn read_jar(env: &TestEnv, name: &str) -> Vec<u8> {
  std::fs::read(env.path("dist").join(name)).unwrap()
}

#[test]
fn compile_writes_jar_for_target() {
  let env = workspace();
  let jdk = env.fake_jdk();

  env
    .kiln_cmd()
    .args(["compile", "src/app", "--java-home"])
    .arg(&jdk)
    .assert()
    .success()
    .stdout(predicate::str::contains("src/app:app"))
    .stdout(predicate::str::contains("Succeeded: 2"));

  let jar = read_jar(&env, "src.app.app.jar");
  assert_eq!(&jar[..2], b"PK");
  assert!(!env.path("dist/src.util.util.jar").exists());
}

#[test]
fn compile_all_roots_by_default() {
  let env = workspace();
  let jdk = env.fake_jdk();

  env
    .kiln_cmd()
    .env("KILN_JAVA_HOME", &jdk)
    .arg("compile")
    .assert()
    .success()
    .stdout(predicate::str::contains("src/cycle/a:a and 1 other"));

  // The alias root passes through the jars of its dependencies.
  assert!(env.path("dist/src.app.app.jar").is_file());
  assert!(env.path("dist/src.cycle.a.a.jar").is_file());
  assert!(!env.path("dist/src.cycle.b.b.jar").exists());
}

#[test]
fn compile_is_reproducible() {
  let env = workspace();
  let jdk = env.fake_jdk();

  env
    .kiln_cmd()
    .args(["compile", "src/app", "--java-home"])
    .arg(&jdk)
    .assert()
    .success();
  let first = read_jar(&env, "src.app.app.jar");
  std::fs::remove_dir_all(env.path("dist")).unwrap();

  env
    .kiln_cmd()
    .args(["compile", "src/app", "--jobs", "1", "--java-home"])
    .arg(&jdk)
    .assert()
    .success();
  assert_eq!(read_jar(&env, "src.app.app.jar"), first);
}

#[test]
fn compile_failure_exits_nonzero() {
  let env = workspace();
  env.write_file("src/util/Util.java", "public class Util { COMPILE_ERROR }\n");
  let jdk = env.fake_jdk();

  env
    .kiln_cmd()
    .args(["compile", "src/app", "--java-home"])
    .arg(&jdk)
    .assert()
    .failure()
    .stderr(predicate::str::contains("src/util:util failed with exit code 1"))
    .stderr(predicate::str::contains("cannot find symbol COMPILE_ERROR"))
    .stderr(predicate::str::contains("dependency src/util:util failed"));

  assert!(!env.path("dist/src.app.app.jar").exists());
}

#[test]
fn compile_json_report() {
  let env = workspace();
  let jdk = env.fake_jdk();

  let output = env
    .kiln_cmd()
    .args(["compile", "src/app", "--format", "json", "--java-home"])
    .arg(&jdk)
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["success"], true);
  assert_eq!(json["report"]["resolve"], "default");
  assert_eq!(json["report"]["requested"][0], "src/app:app");
  assert_eq!(json["report"]["components"]["src/util:util"]["result"], "succeeded");
  assert_eq!(json["exported"][0], "src.app.app.jar");
}

#[test]
fn missing_lockfile_is_an_error() {
  let env = TestEnv::new();
  env.write_graph(
    r#"{
      "targets": [
        { "address": "//:guava", "kind": "jvm_artifact", "coordinate": "com.google.guava:guava:33.0-jre" },
        { "address": "src/app", "kind": "java_sources", "sources": ["src/app"], "dependencies": ["//:guava"] }
      ]
    }"#,
  );
  env.write_file("src/app/App.java", "public class App {}\n");
  let jdk = env.fake_jdk();

  env
    .kiln_cmd()
    .args(["compile", "--java-home"])
    .arg(&jdk)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Compile failed"))
    .stderr(predicate::str::contains("default.lock.json"));
}

#[test]
fn missing_jdk_is_reported() {
  let env = workspace();

  env
    .kiln_cmd()
    .arg("compile")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to set up the JDK"));
}
