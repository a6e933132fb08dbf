//! Graph command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

const CYCLIC_GRAPH: &str = r#"{
  "targets": [
    { "address": "src/base", "kind": "java_sources", "sources": ["src/base"] },
    { "address": "src/a", "kind": "java_sources", "sources": ["src/a"], "dependencies": ["src/b", "src/base"] },
    { "address": "src/b", "kind": "java_sources", "sources": ["src/b"], "dependencies": ["src/c"] },
    { "address": "src/c", "kind": "java_sources", "sources": ["src/c"], "dependencies": ["src/a"] }
  ]
}"#;

#[test]
fn graph_marks_cycles() {
  let env = TestEnv::new();
  env.write_graph(CYCLIC_GRAPH);

  env
    .kiln_cmd()
    .arg("graph")
    .assert()
    .success()
    .stdout(predicate::str::contains("4 targets in 2 components"))
    .stdout(predicate::str::contains("src/a:a and 2 others"))
    .stdout(predicate::str::contains("(cycle)"));
}

#[test]
fn graph_json_lists_components_in_dependency_order() {
  let env = TestEnv::new();
  env.write_graph(CYCLIC_GRAPH);

  let output = env.kiln_cmd().args(["graph", "--format", "json"]).output().unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let components = json["components"].as_array().unwrap();
  assert_eq!(components.len(), 2);
  assert_eq!(components[0]["component"], "src/base:base");
  assert_eq!(components[0]["cycle"], false);
  assert_eq!(components[1]["members"], serde_json::json!(["src/a:a", "src/b:b", "src/c:c"]));
  assert_eq!(components[1]["dependencies"], serde_json::json!(["src/base:base"]));
  assert_eq!(json["roots"], serde_json::json!(["src/a:a and 2 others"]));
}

#[test]
fn graph_reads_custom_path() {
  let env = TestEnv::new();
  env.write_file("build/graph.json", CYCLIC_GRAPH);

  env
    .kiln_cmd()
    .args(["--graph", "build/graph.json", "graph"])
    .assert()
    .success()
    .stdout(predicate::str::contains("src/base:base"));
}

#[test]
fn graph_rejects_unknown_dependencies() {
  let env = TestEnv::new();
  env.write_graph(r#"{ "targets": [{ "address": "src/a", "kind": "alias", "dependencies": ["src/gone"] }] }"#);

  env
    .kiln_cmd()
    .arg("graph")
    .assert()
    .failure()
    .stderr(predicate::str::contains("depends on unknown target src/gone:gone"));
}
