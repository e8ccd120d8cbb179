use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn pipegraph(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pipegraph").unwrap();
    cmd.current_dir(workdir)
        .env_remove("RUST_LOG")
        .env_remove("PIPEGRAPH_LOG_DIR")
        .env_remove("PIPEGRAPH_LOG_CONSOLE")
        .env_remove("PIPEGRAPH_PIPELINE_VARIANT")
        .env_remove("PIPEGRAPH_NODE_WIDTH");
    cmd
}

fn run_document() -> Value {
    json!({
        "metadata": {
            "name": "my-run",
            "annotations": {
                "tekton.dev/output_artifacts": json!({
                    "a": [{"name": "out", "key": "artifacts/$PIPELINERUN/a/out.tgz"}]
                }).to_string()
            }
        },
        "spec": {
            "params": [{"name": "greeting", "value": "hello"}],
            "pipelineSpec": {"tasks": [
                {"name": "a"},
                {"name": "b", "params": [{"name": "x", "value": "$(tasks.a.results.out)"}]}
            ]}
        },
        "status": {"taskRuns": {
            "run-a": {
                "pipelineTaskName": "a",
                "status": {
                    "podName": "my-run-a-pod",
                    "conditions": [{"type": "Succeeded", "status": "True", "reason": "Succeeded"}],
                    "taskResults": [{"name": "out", "value": "42"}]
                }
            },
            "run-b": {
                "pipelineTaskName": "b",
                "spec": {"params": [{"name": "x", "value": "$(tasks.a.results.out)"}]},
                "status": {
                    "podName": "my-run-b-pod",
                    "conditions": [{"type": "Succeeded", "status": "Unknown", "reason": "Running"}]
                }
            }
        }}
    })
}

fn workspace_with_run() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("run.json"), run_document().to_string()).unwrap();
    dir
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is JSON")
}

#[test]
fn test_graph_command_prints_nodes_and_edges() {
    let dir = workspace_with_run();
    let graph = stdout_json(pipegraph(dir.path()).args(["graph", "run.json"]));

    let mut ids: Vec<&str> = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|node| node["id"].as_str().unwrap())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["my-run-a-pod", "my-run-b-pod"]);
    assert_eq!(
        graph["edges"],
        json!([{"parent": "my-run-a-pod", "child": "my-run-b-pod"}])
    );
}

#[test]
fn test_graph_command_renders_dot() {
    let dir = workspace_with_run();
    pipegraph(dir.path())
        .args(["graph", "run.json", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph"))
        .stdout(predicate::str::contains(
            "label = \"my-run-a-pod\\la\\lSucceeded\"",
        ))
        .stdout(predicate::str::contains("->"));
}

#[test]
fn test_graph_command_applies_workspace_config() {
    let dir = workspace_with_run();
    fs::write(dir.path().join("pipegraph.toml"), "[graph]\nnode_width = 99\n").unwrap();
    let graph = stdout_json(pipegraph(dir.path()).args(["graph", "run.json"]));
    assert_eq!(graph["nodes"][0]["width"], json!(99));
}

#[test]
fn test_node_command_reports_resolved_inputs() {
    let dir = workspace_with_run();
    let details = stdout_json(pipegraph(dir.path()).args(["node", "run.json", "my-run-b-pod"]));
    assert_eq!(details["task_name"], json!("b"));
    assert_eq!(details["inputs"], json!([{"name": "x", "value": "42"}]));

    let producer = stdout_json(pipegraph(dir.path()).args(["node", "run.json", "my-run-a-pod"]));
    assert_eq!(
        producer["artifacts"]["outputs"][0]["key"],
        json!("artifacts/my-run/a/out.tgz")
    );
}

#[test]
fn test_node_command_unknown_node_fails() {
    let dir = workspace_with_run();
    pipegraph(dir.path())
        .args(["node", "run.json", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("node 'ghost' not found"));
}

#[test]
fn test_params_command_lists_pipeline_parameters() {
    let dir = workspace_with_run();
    let params = stdout_json(pipegraph(dir.path()).args(["params", "run.json"]));
    assert_eq!(params, json!([{"name": "greeting", "value": "hello"}]));
}

#[test]
fn test_outbound_command_lists_leaves() {
    let dir = workspace_with_run();
    let leaves = stdout_json(pipegraph(dir.path()).args(["outbound", "run.json", "my-run-a-pod"]));
    assert_eq!(leaves, json!(["my-run-b-pod"]));

    pipegraph(dir.path())
        .args(["outbound", "run.json", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RG-GRAPH-002"));
}

#[test]
fn test_storage_path_command() {
    let dir = TempDir::new().unwrap();
    let path = stdout_json(pipegraph(dir.path()).args(["storage-path", "s3://bucket/a/b.tgz"]));
    assert_eq!(
        path,
        json!({"source": "s3", "bucket": "bucket", "key": "a/b.tgz"})
    );

    pipegraph(dir.path())
        .args(["storage-path", "ftp://host/file"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RG-PATH-001"));
}

#[test]
fn test_invalid_document_reports_code() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.json"), "{\"metadata\": ").unwrap();
    pipegraph(dir.path())
        .args(["graph", "broken.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RG-DOC-001"));
}

#[test]
fn test_workspace_logging_filter_does_not_block_commands() {
    let dir = workspace_with_run();
    fs::create_dir_all(dir.path().join(".pipegraph")).unwrap();
    fs::write(
        dir.path().join(".pipegraph").join("logging.toml"),
        "[logging]\ndefault_level = \"pipegraph=debug,info\"\nconsole_output = \"none\"\n",
    )
    .unwrap();
    let params = stdout_json(pipegraph(dir.path()).args(["params", "run.json"]));
    assert_eq!(params, json!([{"name": "greeting", "value": "hello"}]));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = workspace_with_run();
    pipegraph(dir.path())
        .args(["graph", "run.json", "--config", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RG-CFG-002"));
}
