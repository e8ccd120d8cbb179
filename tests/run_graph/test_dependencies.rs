#[path = "../common/mod.rs"]
mod common;

use common::{aggregator_task, custom_run, document, failed, param, running, succeeded, with_results};
use pipegraph::core::run_graph::dependencies::{DependencyExtractor, EdgeSource, Extraction};
use pipegraph::core::run_graph::graph::Edge;
use pipegraph::core::run_graph::model::{TaskDecl, DEFAULT_CACHE_LABEL};
use pipegraph::core::run_graph::status_index::StatusIndex;
use pipegraph_types::{Param, PipelineRunDocument};
use serde_json::json;

fn extract(document: &PipelineRunDocument, task: &str) -> Extraction {
    let status = document.status.as_ref().expect("status");
    let index = StatusIndex::from_status(status);
    let tasks = TaskDecl::from_document(document, DEFAULT_CACHE_LABEL);
    let decl = tasks
        .iter()
        .find(|decl| decl.name == task)
        .expect("declared task");
    DependencyExtractor::new(&index, &document.spec.params).edges(decl)
}

fn edges_from(extraction: &Extraction, source: EdgeSource) -> Vec<Edge> {
    extraction
        .edges
        .iter()
        .filter(|dependency| dependency.source == source)
        .map(|dependency| dependency.edge.clone())
        .collect()
}

#[test]
fn parameter_reference_to_succeeded_parent_yields_edge_and_value() {
    let document = common::two_task_document();
    let extraction = extract(&document, "b");

    assert_eq!(
        edges_from(&extraction, EdgeSource::Parameter),
        vec![Edge::new("my-run-a-pod", "my-run-b-pod")]
    );
    assert_eq!(extraction.resolved, vec![Param::new("x", "42")]);
}

#[test]
fn parameter_reference_to_unfinished_parent_is_gated() {
    for parent in [failed("a", "pod-a"), running("a", "pod-a")] {
        let document = document(
            json!([
                {"name": "a"},
                {"name": "b", "params": [param("x", "$(tasks.a.results.out)")]}
            ]),
            json!({"run-a": parent, "run-b": running("b", "pod-b")}),
            json!({}),
        );
        let extraction = extract(&document, "b");
        assert!(extraction.edges.is_empty());
        assert_eq!(
            extraction.resolved,
            vec![Param::new("x", "$(tasks.a.results.out)")]
        );
    }
}

#[test]
fn pipeline_parameters_resolve_to_run_values() {
    let document = common::document_with(json!({
        "metadata": {"name": "my-run"},
        "spec": {
            "params": [param("greeting", "hello")],
            "pipelineSpec": {"tasks": [{
                "name": "say",
                "params": [
                    param("message", "$(params.greeting)"),
                    param("missing", "$(params.unknown)"),
                    param("fixed", "literal")
                ]
            }]}
        },
        "status": {"taskRuns": {"run-say": running("say", "pod-say")}}
    }));
    let extraction = extract(&document, "say");

    assert!(extraction.edges.is_empty());
    assert_eq!(
        extraction.resolved,
        vec![
            Param::new("message", "hello"),
            Param::new("missing", "$(params.unknown)"),
            Param::new("fixed", "literal"),
        ]
    );
}

#[test]
fn condition_parameters_are_success_gated() {
    let document = document(
        json!([
            {"name": "flip"},
            {"name": "check"},
            {"name": "guarded", "conditions": [
                {"conditionRef": "is-heads", "params": [param("v", "$(tasks.flip.results.side)")]},
                {"conditionRef": "is-ok", "params": [param("v", "$(tasks.check.results.ok)")]}
            ]}
        ]),
        json!({
            "run-flip": with_results(succeeded("flip", "pod-flip"), &[("side", "heads")]),
            "run-check": failed("check", "pod-check"),
            "run-guarded": running("guarded", "pod-guarded")
        }),
        json!({}),
    );
    let extraction = extract(&document, "guarded");

    assert_eq!(
        edges_from(&extraction, EdgeSource::Condition),
        vec![Edge::new("pod-flip", "pod-guarded")]
    );
    assert!(extraction.resolved.is_empty());
}

#[test]
fn when_guards_link_any_recorded_parent() {
    let document = document(
        json!([
            {"name": "a"},
            {"name": "b"},
            {"name": "c", "when": [
                {"input": "$(tasks.a.results.flag)", "operator": "in", "values": ["yes"]},
                {"input": "$(tasks.b.results.flag)", "operator": "in", "values": ["yes"]},
                {"input": "$(tasks.ghost.results.flag)", "operator": "in", "values": ["yes"]}
            ]}
        ]),
        json!({
            "run-a": failed("a", "pod-a"),
            "run-b": running("b", "pod-b"),
            "run-c": running("c", "pod-c")
        }),
        json!({}),
    );
    let extraction = extract(&document, "c");

    assert_eq!(
        edges_from(&extraction, EdgeSource::When),
        vec![Edge::new("pod-a", "pod-c"), Edge::new("pod-b", "pod-c")]
    );
    assert!(!EdgeSource::When.is_success_gated());
}

#[test]
fn aggregator_task_list_and_condition_markers_link_upstream() {
    let document = document(
        json!([
            {"name": "t1"},
            {"name": "t2"},
            {"name": "t3"},
            aggregator_task("any", &[
                "--namespace", "kubeflow",
                "--taskList", "t1,t2",
                "--condition", "results_t3_output == 'true' || results_t1_output == 'x'"
            ])
        ]),
        json!({
            "run-t1": failed("t1", "pod-t1"),
            "run-t2": running("t2", "pod-t2"),
            "run-t3": succeeded("t3", "pod-t3")
        }),
        json!({"run-any": custom_run("any", "Unknown", "Running")}),
    );
    let extraction = extract(&document, "any");

    assert_eq!(
        edges_from(&extraction, EdgeSource::Aggregator),
        vec![
            Edge::new("pod-t1", "any"),
            Edge::new("pod-t2", "any"),
            Edge::new("pod-t3", "any"),
        ]
    );
}

#[test]
fn aggregator_ignores_arguments_after_unrelated_option() {
    let document = document(
        json!([
            {"name": "t1"},
            {"name": "t2"},
            aggregator_task("any", &["--taskList", "t1", "--apiVersion", "t2"])
        ]),
        json!({
            "run-t1": succeeded("t1", "pod-t1"),
            "run-t2": succeeded("t2", "pod-t2")
        }),
        json!({"run-any": custom_run("any", "True", "Succeeded")}),
    );
    let extraction = extract(&document, "any");

    assert_eq!(extraction.edges.len(), 1);
    assert_eq!(extraction.edges[0].edge, Edge::new("pod-t1", "any"));
}

#[test]
fn run_after_requires_succeeded_predecessor() {
    let document = document(
        json!([
            {"name": "first"},
            {"name": "second"},
            {"name": "last", "runAfter": ["first", "second", "never-ran"]}
        ]),
        json!({
            "run-first": succeeded("first", "pod-first"),
            "run-second": failed("second", "pod-second"),
            "run-last": running("last", "pod-last")
        }),
        json!({}),
    );
    let extraction = extract(&document, "last");

    assert_eq!(
        edges_from(&extraction, EdgeSource::RunAfter),
        vec![Edge::new("pod-first", "pod-last")]
    );
    assert!(EdgeSource::RunAfter.is_success_gated());
    assert!(EdgeSource::Parameter.is_success_gated());
    assert!(EdgeSource::Condition.is_success_gated());
    assert!(!EdgeSource::Aggregator.is_success_gated());
}

#[test]
fn gating_depends_on_edge_source_not_parent() {
    let document = document(
        json!([
            {"name": "a"},
            {"name": "b", "runAfter": ["a"], "params": [param("x", "$(tasks.a.results.out)")], "when": [
                {"input": "$(tasks.a.results.flag)", "operator": "in", "values": ["1"]}
            ]}
        ]),
        json!({
            "run-a": running("a", "pod-a"),
            "run-b": running("b", "pod-b")
        }),
        json!({}),
    );
    let extraction = extract(&document, "b");

    let sources: Vec<EdgeSource> = extraction.edges.iter().map(|d| d.source).collect();
    assert_eq!(sources, vec![EdgeSource::When]);
    for dependency in &extraction.edges {
        assert!(!dependency.source.is_success_gated());
    }
}
