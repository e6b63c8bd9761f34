// tests/graph_properties.rs

use std::collections::HashSet;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use proptest::prelude::*;

use pipelinerun::dag::{DependencyGraph, GraphBuilder};
use pipelinerun::schema::{graph_from_refs, refs_from_graph};

/// Arbitrary declarations: task `i` lists some task indices as predecessors,
/// including itself and later tasks, so cycles are possible.
fn declarations_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(0..n, 0..3), n)
    })
}

fn name(i: usize) -> String {
    format!("task_{i}")
}

fn build(decls: &[Vec<usize>]) -> DependencyGraph {
    let mut builder = GraphBuilder::new();
    for (i, prev) in decls.iter().enumerate() {
        let prev: Vec<String> = prev.iter().map(|&p| name(p)).collect();
        let prev: Vec<&str> = prev.iter().map(String::as_str).collect();
        builder.add_task(&name(i), &prev, &[]).unwrap();
    }
    builder.build().unwrap()
}

fn oracle_is_cyclic(decls: &[Vec<usize>]) -> bool {
    let mut g = DiGraph::<(), ()>::new();
    let nodes: Vec<_> = (0..decls.len()).map(|_| g.add_node(())).collect();
    for (i, prev) in decls.iter().enumerate() {
        for &p in prev {
            g.add_edge(nodes[p], nodes[i], ());
        }
    }
    is_cyclic_directed(&g)
}

proptest! {
    #[test]
    fn validate_agrees_with_petgraph(decls in declarations_strategy(8)) {
        let graph = build(&decls);
        prop_assert_eq!(graph.validate().is_err(), oracle_is_cyclic(&decls));
    }

    #[test]
    fn reported_cycle_is_a_real_path(decls in declarations_strategy(8)) {
        let graph = build(&decls);
        if let Err(pipelinerun::errors::PipelineRunError::CycleDetected { cycle }) = graph.validate() {
            prop_assert!(cycle.len() >= 2);
            prop_assert_eq!(cycle.first(), cycle.last());
            for pair in cycle.windows(2) {
                prop_assert!(graph.next_tasks(&pair[0]).contains(&pair[1].as_str()));
            }
        }
    }

    #[test]
    fn topological_order_respects_every_edge(decls in declarations_strategy(8)) {
        let graph = build(&decls);
        prop_assume!(graph.validate().is_ok());

        let order = graph.topological_order().unwrap();
        prop_assert_eq!(order.len(), graph.len());
        let position = |n: &str| order.iter().position(|o| *o == n).unwrap();
        for edge in graph.edges() {
            prop_assert!(position(graph.name(edge.prev)) < position(graph.name(edge.next)));
        }
    }

    #[test]
    fn ready_tasks_drain_an_acyclic_graph(decls in declarations_strategy(8)) {
        let graph = build(&decls);
        prop_assume!(graph.validate().is_ok());

        let mut completed: HashSet<String> = HashSet::new();
        while completed.len() < graph.len() {
            let ready: Vec<String> = graph.ready_tasks(&completed).map(str::to_string).collect();
            prop_assert!(!ready.is_empty());
            for task in &ready {
                for prev in graph.prev_tasks(task) {
                    prop_assert!(completed.contains(prev));
                }
            }
            completed.extend(ready);
        }
    }

    #[test]
    fn persisted_shape_preserves_edges(decls in declarations_strategy(8)) {
        let graph = build(&decls);
        prop_assume!(graph.validate().is_ok());

        let rebuilt = graph_from_refs(&refs_from_graph(&graph)).unwrap();
        for task in graph.task_names() {
            prop_assert_eq!(graph.prev_tasks(task), rebuilt.prev_tasks(task));
            prop_assert_eq!(graph.next_tasks(task), rebuilt.next_tasks(task));
        }
    }
}
