// src/dag/graph.rs

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use crate::errors::{PipelineRunError, Result};
use crate::types::TaskName;

/// Compact handle for a task in a [`DependencyGraph`].
///
/// Handles are assigned in declaration order, so comparing two handles
/// compares declaration positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u32);

impl TaskHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A `prev -> next` dependency: `next` may not start before `prev` succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub prev: TaskHandle,
    pub next: TaskHandle,
}

type EdgeId = usize;

#[derive(Debug, Clone)]
struct Node {
    name: TaskName,
    /// Edges where this node is `next`.
    incoming: Vec<EdgeId>,
    /// Edges where this node is `prev`.
    outgoing: Vec<EdgeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Dependency graph over the task runs of one pipeline run.
///
/// Nodes live in a vector addressed by [`TaskHandle`]; all edges live in a
/// single arena and nodes only hold edge ids. A node never refers to another
/// node directly, and the `prev`/`next` views of an edge are derived from the
/// same arena entry, so both sides of a dependency always agree.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    index: HashMap<TaskName, TaskHandle>,
    edges: Vec<Edge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a task on an existing graph.
    ///
    /// Every name in `prev` / `next` must already be declared (or be `name`
    /// itself). The inverse side of each edge is populated automatically.
    pub fn add_task(&mut self, name: &str, prev: &[&str], next: &[&str]) -> Result<TaskHandle> {
        if self.index.contains_key(name) {
            return Err(PipelineRunError::DuplicateTask(name.to_string()));
        }

        for reference in prev.iter().chain(next.iter()) {
            if *reference != name && !self.index.contains_key(*reference) {
                return Err(PipelineRunError::DanglingReference {
                    task: name.to_string(),
                    reference: reference.to_string(),
                });
            }
        }

        let handle = self.insert_node(name);
        for p in prev {
            let p = self.index[*p];
            self.insert_edge(p, handle);
        }
        for n in next {
            let n = self.index[*n];
            self.insert_edge(handle, n);
        }

        debug!(task = %name, prev = ?prev, next = ?next, "task added to dependency graph");
        Ok(handle)
    }

    pub(crate) fn insert_node(&mut self, name: &str) -> TaskHandle {
        let handle = TaskHandle(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.to_string(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        self.index.insert(name.to_string(), handle);
        handle
    }

    /// Insert `prev -> next` unless it is already present.
    pub(crate) fn insert_edge(&mut self, prev: TaskHandle, next: TaskHandle) {
        let exists = self.nodes[prev.index()]
            .outgoing
            .iter()
            .any(|&id| self.edges[id].next == next);
        if exists {
            return;
        }

        let id = self.edges.len();
        self.edges.push(Edge { prev, next });
        self.nodes[prev.index()].outgoing.push(id);
        self.nodes[next.index()].incoming.push(id);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn handle(&self, name: &str) -> Option<TaskHandle> {
        self.index.get(name).copied()
    }

    /// Name of the task behind `handle`.
    ///
    /// Panics if the handle came from another graph.
    pub fn name(&self, handle: TaskHandle) -> &str {
        &self.nodes[handle.index()].name
    }

    /// All handles in declaration order.
    pub fn handles(&self) -> impl Iterator<Item = TaskHandle> + '_ {
        (0..self.nodes.len()).map(|i| TaskHandle(i as u32))
    }

    /// All task names in declaration order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn prev_handles(&self, handle: TaskHandle) -> impl Iterator<Item = TaskHandle> + '_ {
        self.nodes[handle.index()]
            .incoming
            .iter()
            .map(|&id| self.edges[id].prev)
    }

    pub fn next_handles(&self, handle: TaskHandle) -> impl Iterator<Item = TaskHandle> + '_ {
        self.nodes[handle.index()]
            .outgoing
            .iter()
            .map(|&id| self.edges[id].next)
    }

    /// Predecessors of `name` (its `prevTasks`). Empty for unknown tasks.
    pub fn prev_tasks(&self, name: &str) -> Vec<&str> {
        match self.handle(name) {
            Some(h) => self.prev_handles(h).map(|p| self.name(p)).collect(),
            None => Vec::new(),
        }
    }

    /// Successors of `name` (its `nextTasks`). Empty for unknown tasks.
    pub fn next_tasks(&self, name: &str) -> Vec<&str> {
        match self.handle(name) {
            Some(h) => self.next_handles(h).map(|n| self.name(n)).collect(),
            None => Vec::new(),
        }
    }

    /// Tasks without predecessors.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| n.incoming.is_empty())
            .map(|n| n.name.as_str())
    }

    /// Every task reachable from `handle` through `next` edges, excluding
    /// `handle` itself unless it sits on a cycle.
    pub fn downstream_of(&self, handle: TaskHandle) -> Vec<TaskHandle> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue: VecDeque<TaskHandle> = self.next_handles(handle).collect();
        let mut out = Vec::new();

        while let Some(h) = queue.pop_front() {
            if seen[h.index()] {
                continue;
            }
            seen[h.index()] = true;
            out.push(h);
            queue.extend(self.next_handles(h));
        }

        out
    }

    /// Check that the graph is acyclic.
    ///
    /// Depth-first traversal with a three-color visited set, started from
    /// every node in declaration order. The error names the first cycle
    /// found as a sequence that starts and ends with the same task.
    pub fn validate(&self) -> Result<()> {
        let mut color = vec![Color::White; self.nodes.len()];

        for start in self.handles() {
            if color[start.index()] != Color::White {
                continue;
            }

            // Frames of (node, position in its outgoing list).
            let mut stack: Vec<(TaskHandle, usize)> = vec![(start, 0)];
            color[start.index()] = Color::Gray;

            while let Some(frame) = stack.last_mut() {
                let (node, pos) = *frame;
                let outgoing = &self.nodes[node.index()].outgoing;

                if pos == outgoing.len() {
                    color[node.index()] = Color::Black;
                    stack.pop();
                    continue;
                }
                frame.1 += 1;

                let next = self.edges[outgoing[pos]].next;
                match color[next.index()] {
                    Color::White => {
                        color[next.index()] = Color::Gray;
                        stack.push((next, 0));
                    }
                    Color::Gray => {
                        let from = stack
                            .iter()
                            .position(|(h, _)| *h == next)
                            .unwrap_or(0);
                        let mut cycle: Vec<TaskName> = stack[from..]
                            .iter()
                            .map(|(h, _)| self.name(*h).to_string())
                            .collect();
                        cycle.push(self.name(next).to_string());
                        debug!(?cycle, "cycle detected in dependency graph");
                        return Err(PipelineRunError::CycleDetected { cycle });
                    }
                    Color::Black => {}
                }
            }
        }

        trace!(tasks = self.len(), edges = self.edges.len(), "dependency graph validated");
        Ok(())
    }

    /// Topological order of all tasks, ties broken by declaration order.
    pub fn topological_order(&self) -> Result<Vec<&str>> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.incoming.len()).collect();
        let mut heap: BinaryHeap<Reverse<TaskHandle>> = self
            .handles()
            .filter(|h| in_degree[h.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(h)) = heap.pop() {
            order.push(self.name(h));
            for next in self.next_handles(h) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    heap.push(Reverse(next));
                }
            }
        }

        if order.len() != self.nodes.len() {
            // Kahn's algorithm only tells us *that* there is a cycle.
            self.validate()?;
        }
        Ok(order)
    }

    /// Tasks whose predecessors are all in `completed` and which are not
    /// themselves in `completed`.
    ///
    /// The order of the returned names is unspecified.
    pub fn ready_tasks<'a>(
        &'a self,
        completed: &'a HashSet<TaskName>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.nodes.iter().filter_map(move |node| {
            let ready = !completed.contains(node.name.as_str())
                && node
                    .incoming
                    .iter()
                    .all(|&id| completed.contains(self.name(self.edges[id].prev)));
            ready.then_some(node.name.as_str())
        })
    }

    /// Like [`ready_tasks`](Self::ready_tasks), additionally skipping tasks
    /// that were already started.
    pub fn ready_tasks_excluding<'a>(
        &'a self,
        completed: &'a HashSet<TaskName>,
        started: &'a HashSet<TaskName>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.ready_tasks(completed)
            .filter(move |name| !started.contains(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<TaskName> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn fan_out() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        g.add_task("A", &[], &[]).unwrap();
        g.add_task("B", &["A"], &[]).unwrap();
        g.add_task("C", &["A"], &[]).unwrap();
        g
    }

    #[test]
    fn inverse_edges_are_populated() {
        let g = fan_out();
        assert_eq!(g.next_tasks("A"), vec!["B", "C"]);
        assert_eq!(g.prev_tasks("B"), vec!["A"]);
        assert_eq!(g.edges().len(), 2);
    }

    #[test]
    fn next_reference_creates_predecessor_on_target() {
        let mut g = DependencyGraph::new();
        g.add_task("deploy", &[], &[]).unwrap();
        g.add_task("build", &[], &["deploy"]).unwrap();
        assert_eq!(g.prev_tasks("deploy"), vec!["build"]);
        assert_eq!(g.roots().collect::<Vec<_>>(), vec!["build"]);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut g = DependencyGraph::new();
        g.add_task("A", &[], &[]).unwrap();
        g.add_task("B", &["A", "A"], &[]).unwrap();
        assert_eq!(g.edges().len(), 1);
    }

    #[test]
    fn duplicate_task_is_rejected() {
        let mut g = fan_out();
        let err = g.add_task("B", &[], &[]).unwrap_err();
        assert!(matches!(err, PipelineRunError::DuplicateTask(ref n) if n == "B"));
    }

    #[test]
    fn unknown_reference_is_dangling() {
        let mut g = fan_out();
        let err = g.add_task("D", &["Z"], &[]).unwrap_err();
        match err {
            PipelineRunError::DanglingReference { task, reference } => {
                assert_eq!(task, "D");
                assert_eq!(reference, "Z");
            }
            other => panic!("expected DanglingReference, got {other:?}"),
        }
        assert!(!g.contains("D"));
    }

    #[test]
    fn ready_tasks_follow_completion() {
        let g = fan_out();
        let none = set(&[]);
        let ready: HashSet<&str> = g.ready_tasks(&none).collect();
        assert_eq!(ready, HashSet::from(["A"]));

        let done = set(&["A"]);
        let ready: HashSet<&str> = g.ready_tasks(&done).collect();
        assert_eq!(ready, HashSet::from(["B", "C"]));
    }

    #[test]
    fn ready_tasks_skip_started() {
        let g = fan_out();
        let completed = set(&["A"]);
        let started = set(&["B"]);
        let ready: Vec<&str> = g.ready_tasks_excluding(&completed, &started).collect();
        assert_eq!(ready, vec!["C"]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut g = DependencyGraph::new();
        g.add_task("A", &["A"], &[]).unwrap();
        match g.validate() {
            Err(PipelineRunError::CycleDetected { cycle }) => assert_eq!(cycle, vec!["A", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_sequence_is_reported_in_traversal_order() {
        let mut g = DependencyGraph::new();
        g.add_task("A", &[], &[]).unwrap();
        g.add_task("B", &["A"], &[]).unwrap();
        g.add_task("C", &["B"], &["A"]).unwrap();
        match g.validate() {
            Err(PipelineRunError::CycleDetected { cycle }) => {
                assert_eq!(cycle, vec!["A", "B", "C", "A"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(g.topological_order().is_err());
    }

    #[test]
    fn topological_order_prefers_declaration_order() {
        let mut g = DependencyGraph::new();
        g.add_task("lint", &[], &[]).unwrap();
        g.add_task("build", &[], &[]).unwrap();
        g.add_task("test", &["build"], &[]).unwrap();
        g.add_task("package", &["test", "lint"], &[]).unwrap();
        assert_eq!(
            g.topological_order().unwrap(),
            vec!["lint", "build", "test", "package"]
        );
    }

    #[test]
    fn downstream_is_transitive() {
        let mut g = DependencyGraph::new();
        g.add_task("A", &[], &[]).unwrap();
        g.add_task("B", &["A"], &[]).unwrap();
        g.add_task("C", &["B"], &[]).unwrap();
        g.add_task("D", &[], &[]).unwrap();
        let a = g.handle("A").unwrap();
        let names: Vec<&str> = g.downstream_of(a).into_iter().map(|h| g.name(h)).collect();
        assert_eq!(names, vec!["B", "C"]);
    }
}
