#[path = "../common/mod.rs"]
mod common;

use common::{document, document_with, failed, param, running, succeeded, two_task_document};
use pipegraph::core::run_graph::assembler::{
    GraphAssembler, GraphOptions, PipelineVariant, CONDITION_CHECK_FAILED,
};
use pipegraph::core::run_graph::graph::Edge;
use pipegraph::core::run_graph::model::{TaskDecl, DEFAULT_CACHE_LABEL};
use pipegraph::core::run_graph::presentation::{NodePhase, StaticExecutionStates};
use pipegraph_types::{Param, PipelineRunDocument};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn producer_consumer_run_builds_linked_graph() {
    let document = two_task_document();
    let assembler = GraphAssembler::default();
    let tasks = TaskDecl::from_document(&document, DEFAULT_CACHE_LABEL);
    let assembly = assembler.assemble(&tasks, &document);

    assert_eq!(assembly.graph.node_ids(), ids(&["my-run-a-pod", "my-run-b-pod"]));
    assert!(assembly.graph.has_edge("my-run-a-pod", "my-run-b-pod"));
    assert_eq!(assembly.graph.edge_count(), 1);

    let consumer = assembly.graph.node("my-run-b-pod").expect("consumer node");
    assert_eq!(consumer.task_name, "b");
    assert_eq!(consumer.status, "Running");
    assert_eq!(consumer.phase, NodePhase::Running);

    let record = assembly.index.get("b").expect("consumer record");
    assert_eq!(record.params, vec![Param::new("x", "42")]);
}

#[test]
fn assembly_leaves_input_document_untouched() {
    let document = two_task_document();
    let before = serde_json::to_value(&document).expect("serialize");
    let _ = GraphAssembler::default().build_document(&document);
    let after = serde_json::to_value(&document).expect("serialize");
    assert_eq!(before, after);
}

#[test]
fn task_order_does_not_change_the_graph() {
    let document = document(
        json!([
            {"name": "a"},
            {"name": "b", "params": [param("x", "$(tasks.a.results.out)")]},
            {"name": "c", "runAfter": ["a", "b"]},
            {"name": "d", "when": [{"input": "$(tasks.c.results.flag)", "operator": "in", "values": ["1"]}]},
            {"name": "e", "runAfter": ["d"]}
        ]),
        json!({
            "run-a": succeeded("a", "pod-a"),
            "run-b": succeeded("b", "pod-b"),
            "run-c": failed("c", "pod-c"),
            "run-e": running("e", "pod-e")
        }),
        json!({}),
    );
    let assembler = GraphAssembler::default();
    let tasks = TaskDecl::from_document(&document, DEFAULT_CACHE_LABEL);
    let reference = assembler.build(&tasks, &document);

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let mut shuffled = tasks.clone();
        shuffled.shuffle(&mut rng);
        let graph = assembler.build(&shuffled, &document);
        assert_eq!(graph.node_ids(), reference.node_ids());
        assert_eq!(graph.edge_set(), reference.edge_set());
    }

    assert_eq!(
        reference.edge_set(),
        [
            Edge::new("pod-a", "pod-b"),
            Edge::new("pod-a", "pod-c"),
            Edge::new("pod-b", "pod-c"),
            Edge::new("pod-c", "d"),
        ]
        .into_iter()
        .collect()
    );
}

#[test]
fn gated_edges_follow_parent_success() {
    let cases = [
        (succeeded("a", "pod-a"), true),
        (failed("a", "pod-a"), false),
        (running("a", "pod-a"), false),
    ];
    for (parent, linked) in cases {
        let document = document(
            json!([
                {"name": "a"},
                {"name": "b", "params": [param("x", "$(tasks.a.results.out)")]}
            ]),
            json!({"run-a": parent, "run-b": running("b", "pod-b")}),
            json!({}),
        );
        let graph = GraphAssembler::default().build_document(&document);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.has_edge("pod-a", "pod-b"), linked);
    }
}

fn when_only_document(skipped: bool) -> PipelineRunDocument {
    let skipped_tasks = if skipped {
        json!([{"name": "guarded"}])
    } else {
        json!([])
    };
    document_with(json!({
        "metadata": {"name": "my-run"},
        "spec": {"pipelineSpec": {"tasks": [
            {"name": "flip"},
            {"name": "guarded", "when": [
                {"input": "$(tasks.flip.results.side)", "operator": "in", "values": ["heads"]}
            ]},
            {"name": "unrelated"}
        ]}},
        "status": {
            "taskRuns": {"run-flip": succeeded("flip", "pod-flip")},
            "skippedTasks": skipped_tasks
        }
    }))
}

#[test]
fn when_guarded_task_without_record_is_materialized() {
    let graph = GraphAssembler::default().build_document(&when_only_document(true));

    assert_eq!(graph.node_ids(), ids(&["pod-flip", "guarded"]));
    assert!(graph.has_edge("pod-flip", "guarded"));
    let guarded = graph.node("guarded").expect("guarded node");
    assert_eq!(guarded.status, CONDITION_CHECK_FAILED);
    assert_eq!(guarded.phase, NodePhase::Skipped);
    assert!(graph.node("unrelated").is_none());
}

#[test]
fn when_guarded_task_not_yet_skipped_is_pending() {
    let graph = GraphAssembler::default().build_document(&when_only_document(false));
    let guarded = graph.node("guarded").expect("guarded node");
    assert_eq!(guarded.status, "Pending");
    assert_eq!(guarded.phase, NodePhase::Pending);
}

#[test]
fn finally_tasks_use_exit_handler_color() {
    let document = document_with(json!({
        "metadata": {"name": "my-run"},
        "spec": {"pipelineSpec": {
            "tasks": [{"name": "work"}],
            "finally": [{"name": "cleanup"}]
        }},
        "status": {"taskRuns": {
            "run-work": failed("work", "pod-work"),
            "run-cleanup": succeeded("cleanup", "pod-cleanup")
        }}
    }));
    let options = GraphOptions {
        exit_handler_color: "#123456".to_string(),
        ..GraphOptions::default()
    };
    let graph = GraphAssembler::new(options).build_document(&document);

    let cleanup = graph.node("pod-cleanup").expect("cleanup node");
    assert!(cleanup.exit_handler);
    assert_eq!(cleanup.color, "#123456");
    let work = graph.node("pod-work").expect("work node");
    assert!(!work.exit_handler);
    assert_eq!(work.color, "#fce8e6");
    assert_eq!(work.width, 172);
    assert_eq!(work.height, 64);
}

#[test]
fn execution_state_is_consulted_only_for_v2_runs() {
    let document = two_task_document();
    let states = || {
        StaticExecutionStates::new(HashMap::from([(
            "my-run-a-pod".to_string(),
            "cached".to_string(),
        )]))
    };

    let v2 = GraphAssembler::new(GraphOptions {
        variant: PipelineVariant::V2,
        ..GraphOptions::default()
    })
    .with_execution_states(states())
    .build_document(&document);
    let icon = &v2.node("my-run-a-pod").expect("node").icon;
    assert_eq!(icon.name, "cached");
    assert_eq!(icon.execution_state.as_deref(), Some("cached"));

    let v1 = GraphAssembler::default()
        .with_execution_states(states())
        .build_document(&document);
    let icon = &v1.node("my-run-a-pod").expect("node").icon;
    assert_eq!(icon.name, "check_circle");
    assert_eq!(icon.duration_seconds, Some(60));
    assert!(icon.execution_state.is_none());
}

#[test]
fn labels_come_from_task_annotations() {
    let document = document(
        json!([
            {"name": "train", "taskSpec": {"metadata": {"annotations": {
                "pipelines.kubeflow.org/task_display_name": "Train model"
            }}}},
            {"name": "evaluate", "taskSpec": {"metadata": {"annotations": {
                "pipelines.kubeflow.org/component_spec": "{\"name\": \"Evaluate\"}"
            }}}},
            {"name": "plain"}
        ]),
        json!({
            "run-train": succeeded("train", "pod-train"),
            "run-evaluate": succeeded("evaluate", "pod-evaluate"),
            "run-plain": succeeded("plain", "pod-plain")
        }),
        json!({}),
    );
    let graph = GraphAssembler::default().build_document(&document);

    assert_eq!(graph.node("pod-train").unwrap().label, "Train model");
    assert_eq!(graph.node("pod-evaluate").unwrap().label, "Evaluate");
    assert_eq!(graph.node("pod-plain").unwrap().label, "plain");
}

#[test]
fn node_identity_falls_back_to_task_name_without_pod() {
    let document = document(
        json!([
            {"name": "a"},
            {"name": "b", "runAfter": ["a"]}
        ]),
        json!({
            "run-a": succeeded("a", ""),
            "run-b": running("b", "pod-b")
        }),
        json!({}),
    );
    let graph = GraphAssembler::default().build_document(&document);

    assert_eq!(graph.node_ids(), ids(&["a", "pod-b"]));
    assert!(graph.has_edge("a", "pod-b"));
}

#[test]
fn shared_pod_name_resolves_to_same_task_in_any_order() {
    let document = document(
        json!([{"name": "y"}, {"name": "x"}]),
        json!({
            "run-x": succeeded("x", "shared-pod"),
            "run-y": failed("y", "shared-pod")
        }),
        json!({}),
    );
    let assembler = GraphAssembler::default();
    let tasks = TaskDecl::from_document(&document, DEFAULT_CACHE_LABEL);
    let mut reversed = tasks.clone();
    reversed.reverse();

    for order in [tasks, reversed] {
        let graph = assembler.build(&order, &document);
        assert_eq!(graph.node_count(), 1);
        let node = graph.node("shared-pod").expect("shared node");
        assert_eq!(node.task_name, "x");
        assert_eq!(node.status, "Succeeded");
    }
}

#[test]
fn runs_without_records_produce_empty_graph() {
    let document = document_with(json!({
        "metadata": {"name": "my-run"},
        "spec": {"pipelineSpec": {"tasks": [{"name": "a"}]}},
        "status": {"conditions": [{"type": "Succeeded", "status": "Unknown", "reason": "Running"}]}
    }));
    assert!(GraphAssembler::default().build_document(&document).is_empty());

    let no_status = document_with(json!({"metadata": {"name": "my-run"}}));
    assert!(GraphAssembler::default().build_document(&no_status).is_empty());
}

#[test]
fn edges_to_undeclared_tasks_are_dropped() {
    let document = document(
        json!([
            {"name": "b", "params": [param("x", "$(tasks.a.results.out)")]}
        ]),
        json!({
            "run-a": succeeded("a", "pod-a"),
            "run-b": running("b", "pod-b")
        }),
        json!({}),
    );
    let graph = GraphAssembler::default().build_document(&document);
    assert_eq!(graph.node_ids(), ids(&["pod-b"]));
    assert_eq!(graph.edge_count(), 0);
}
