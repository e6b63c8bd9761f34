// tests/dependency_graph.rs

mod common;

use common::{init_tracing, set, sorted};
use pipelinerun::dag::{DependencyGraph, GraphBuilder};
use pipelinerun::errors::PipelineRunError;

fn fan_out() -> DependencyGraph {
    let mut g = DependencyGraph::new();
    g.add_task("A", &[], &[]).unwrap();
    g.add_task("B", &["A"], &[]).unwrap();
    g.add_task("C", &["A"], &[]).unwrap();
    g
}

#[test]
fn only_roots_are_ready_before_anything_completed() {
    init_tracing();
    let g = fan_out();
    g.validate().unwrap();
    assert_eq!(sorted(g.ready_tasks(&set(&[]))), vec!["A"]);
}

#[test]
fn completing_a_root_releases_its_successors() {
    let g = fan_out();
    assert_eq!(sorted(g.ready_tasks(&set(&["A"]))), vec!["B", "C"]);
}

#[test]
fn started_tasks_are_not_ready_again() {
    let g = fan_out();
    let completed = set(&["A"]);
    let started = set(&["A", "B"]);
    assert_eq!(sorted(g.ready_tasks_excluding(&completed, &started)), vec!["C"]);
}

#[test]
fn inverse_edges_are_populated() {
    let mut g = DependencyGraph::new();
    g.add_task("build", &[], &[]).unwrap();
    g.add_task("deploy", &[], &[]).unwrap();
    g.add_task("test", &["build"], &["deploy"]).unwrap();

    assert_eq!(g.next_tasks("build"), vec!["test"]);
    assert_eq!(g.prev_tasks("deploy"), vec!["test"]);
    assert_eq!(g.topological_order().unwrap(), vec!["build", "test", "deploy"]);
}

#[test]
fn isolated_task_is_ready_and_independent() {
    let mut g = fan_out();
    g.add_task("lint", &[], &[]).unwrap();
    assert_eq!(sorted(g.ready_tasks(&set(&[]))), vec!["A", "lint"]);
    assert_eq!(sorted(g.ready_tasks(&set(&["lint"]))), vec!["A"]);
}

#[test]
fn duplicate_and_dangling_names_are_rejected() {
    let mut g = fan_out();
    assert!(matches!(
        g.add_task("A", &[], &[]),
        Err(PipelineRunError::DuplicateTask(name)) if name == "A"
    ));
    match g.add_task("D", &["ghost"], &[]) {
        Err(PipelineRunError::DanglingReference { task, reference }) => {
            assert_eq!(task, "D");
            assert_eq!(reference, "ghost");
        }
        other => panic!("expected DanglingReference, got {other:?}"),
    }
    // A failed add leaves the graph untouched.
    assert!(!g.contains("D"));
    assert_eq!(g.len(), 3);
}

#[test]
fn self_reference_is_a_cycle() {
    let mut g = DependencyGraph::new();
    g.add_task("A", &["A"], &[]).unwrap();
    match g.validate() {
        Err(PipelineRunError::CycleDetected { cycle }) => assert_eq!(cycle, vec!["A", "A"]),
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn builder_reports_the_first_cycle_it_finds() {
    let mut b = GraphBuilder::new();
    b.add_task("A", &["C"], &[]).unwrap();
    b.add_task("B", &["A"], &[]).unwrap();
    b.add_task("C", &["B"], &[]).unwrap();
    b.add_task("D", &[], &[]).unwrap();
    let g = b.build().unwrap();

    let err = g.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "cycle detected in task graph: A -> B -> C -> A"
    );
    assert!(err.is_structural());
    assert!(g.topological_order().is_err());
}

#[test]
fn builder_accepts_forward_references_but_not_undeclared_ones() {
    let mut b = GraphBuilder::new();
    b.add_task("test", &["build"], &[]).unwrap();
    b.add_task("build", &[], &[]).unwrap();
    let g = b.build().unwrap();
    assert_eq!(g.topological_order().unwrap(), vec!["build", "test"]);

    let mut b = GraphBuilder::new();
    b.add_task("test", &["build"], &[]).unwrap();
    assert!(matches!(
        b.build(),
        Err(PipelineRunError::DanglingReference { .. })
    ));
}

#[test]
fn topological_ties_follow_declaration_order() {
    let g = common::diamond();
    assert_eq!(g.topological_order().unwrap(), vec!["A", "B", "C", "D"]);
}
