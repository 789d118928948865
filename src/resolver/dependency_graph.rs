//! Dependency graph over the assets recorded in a manifest.
//!
//! This module provides the graph data structure and algorithms the resolver needs:
//! transitive closure of a target, cycle detection and a deterministic topological order
//! for materialization (dependencies before the assets that require them).
//!
//! All traversals are iterative so deep dependency chains cannot overflow the stack, and
//! every traversal visits neighbors in ascending path order so results are reproducible.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use crate::core::{AssetNode, DependencyCycle, SpiderError};
use crate::manifest::Manifest;

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (on the DFS path).
    Gray,
    /// Node and everything reachable from it has been visited.
    Black,
}

/// Directed "requires" graph keyed by project-relative path.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// The underlying directed graph. Edges point from dependent to dependency.
    graph: DiGraph<AssetNode, ()>,
    /// Map from relative path to graph index.
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Build the graph of every node and edge recorded in `manifest`.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut graph = Self::new();
        for node in manifest.nodes() {
            graph.ensure_node(node.clone());
        }
        for edge in manifest.edges() {
            graph.add_dependency(&edge.from, &edge.to);
        }
        graph
    }

    /// Add a node to the graph if it doesn't already exist.
    ///
    /// Returns the node index in the graph.
    pub fn ensure_node(&mut self, node: AssetNode) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&node.relative_path) {
            index
        } else {
            let key = node.relative_path.clone();
            let index = self.graph.add_node(node);
            self.node_map.insert(key, index);
            index
        }
    }

    /// Record that `from` requires `to`. Unknown endpoints are added as `unknown` nodes.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.index_or_insert(from);
        let to_idx = self.index_or_insert(to);

        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    fn index_or_insert(&mut self, relative_path: &str) -> NodeIndex {
        match self.node_map.get(relative_path) {
            Some(&index) => index,
            None => self.ensure_node(AssetNode::unknown(relative_path)),
        }
    }

    /// The target plus every node reachable from it through dependency edges.
    ///
    /// Terminates on cyclic graphs. A target unknown to the graph yields just itself.
    pub fn transitive_closure(&self, target: &str) -> BTreeSet<String> {
        let mut closure = BTreeSet::new();
        closure.insert(target.to_string());

        let Some(&start) = self.node_map.get(target) else {
            return closure;
        };

        let mut visited = HashSet::from([start]);
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for neighbor in self.graph.neighbors(current) {
                if visited.insert(neighbor) {
                    closure.insert(self.graph[neighbor].relative_path.clone());
                    stack.push(neighbor);
                }
            }
        }

        closure
    }

    /// First cycle in the whole graph, if any.
    pub fn detect_cycle(&self) -> Option<DependencyCycle> {
        let mut indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        indices.sort_by(|a, b| self.graph[*a].relative_path.cmp(&self.graph[*b].relative_path));
        self.find_cycle(&indices, |_| true)
    }

    /// First cycle among `nodes`, ignoring edges that leave the set.
    pub fn detect_cycle_within(&self, nodes: &BTreeSet<String>) -> Option<DependencyCycle> {
        let indices: Vec<NodeIndex> =
            nodes.iter().filter_map(|path| self.node_map.get(path).copied()).collect();
        let members: HashSet<NodeIndex> = indices.iter().copied().collect();
        self.find_cycle(&indices, |idx| members.contains(&idx))
    }

    /// Iterative colored DFS starting from each white node of `starts` in order.
    ///
    /// The returned cycle starts at the first node of the DFS path that closes it.
    fn find_cycle(
        &self,
        starts: &[NodeIndex],
        include: impl Fn(NodeIndex) -> bool,
    ) -> Option<DependencyCycle> {
        let mut colors: HashMap<NodeIndex, Color> = HashMap::new();

        for &start in starts {
            if colors.get(&start).copied().unwrap_or(Color::White) != Color::White {
                continue;
            }

            // Each frame holds a node, its sorted dependencies and the next one to visit.
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            colors.insert(start, Color::Gray);
            stack.push((start, self.sorted_neighbors(start, Direction::Outgoing), 0));

            while let Some((node, neighbors, next)) = stack.last_mut() {
                let Some(&neighbor) = neighbors.get(*next) else {
                    colors.insert(*node, Color::Black);
                    stack.pop();
                    continue;
                };
                *next += 1;

                if !include(neighbor) {
                    continue;
                }

                match colors.get(&neighbor).copied().unwrap_or(Color::White) {
                    Color::Gray => {
                        let cycle_start =
                            stack.iter().position(|(idx, _, _)| *idx == neighbor).unwrap_or(0);
                        let path: Vec<String> = stack[cycle_start..]
                            .iter()
                            .map(|(idx, _, _)| self.graph[*idx].relative_path.clone())
                            .collect();
                        return Some(DependencyCycle::new(path));
                    }
                    Color::White => {
                        colors.insert(neighbor, Color::Gray);
                        let deps = self.sorted_neighbors(neighbor, Direction::Outgoing);
                        stack.push((neighbor, deps, 0));
                    }
                    Color::Black => {}
                }
            }
        }

        None
    }

    /// Order `nodes` so every dependency comes before its dependents.
    ///
    /// Among nodes that are ready at the same time the smallest path goes first, so the
    /// order is fully deterministic. Edges leaving the set are ignored.
    ///
    /// # Errors
    ///
    /// [`SpiderError::CyclicDependency`] when the set contains a cycle. The check runs
    /// before anything is ordered.
    pub fn topological_order(&self, nodes: &BTreeSet<String>) -> Result<Vec<String>, SpiderError> {
        if let Some(cycle) = self.detect_cycle_within(nodes) {
            return Err(SpiderError::CyclicDependency {
                cycle,
            });
        }

        let mut order = Vec::with_capacity(nodes.len());
        let mut pending: HashMap<NodeIndex, usize> = HashMap::new();
        let mut ready: BinaryHeap<Reverse<(String, Option<NodeIndex>)>> = BinaryHeap::new();

        for path in nodes {
            match self.node_map.get(path) {
                Some(&idx) => {
                    let deps = self
                        .graph
                        .neighbors_directed(idx, Direction::Outgoing)
                        .filter(|dep| nodes.contains(&self.graph[*dep].relative_path))
                        .count();
                    if deps == 0 {
                        ready.push(Reverse((path.clone(), Some(idx))));
                    } else {
                        pending.insert(idx, deps);
                    }
                }
                // Paths unknown to the graph have no dependencies.
                None => ready.push(Reverse((path.clone(), None))),
            }
        }

        while let Some(Reverse((path, idx))) = ready.pop() {
            order.push(path);
            let Some(idx) = idx else {
                continue;
            };

            for dependent in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if let Some(remaining) = pending.get_mut(&dependent) {
                    *remaining -= 1;
                    if *remaining == 0 {
                        pending.remove(&dependent);
                        let dependent_path = self.graph[dependent].relative_path.clone();
                        ready.push(Reverse((dependent_path, Some(dependent))));
                    }
                }
            }
        }

        Ok(order)
    }

    fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort_by(|a, b| self.graph[*a].relative_path.cmp(&self.graph[*b].relative_path));
        neighbors.dedup();
        neighbors
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the total number of edges (dependencies) in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Build a human-readable dependency tree rooted at `root`.
    ///
    /// Nodes seen before on the current branch are marked as circular references and not
    /// expanded again.
    pub fn to_tree_string(&self, root: &str) -> String {
        let mut result = String::new();
        let Some(&root_idx) = self.node_map.get(root) else {
            return result;
        };

        result.push_str(&format!("{}\n", self.graph[root_idx]));
        let mut on_branch = HashSet::from([root_idx]);
        self.build_tree_string(root_idx, &mut result, "", &mut on_branch);
        result
    }

    fn build_tree_string(
        &self,
        node: NodeIndex,
        result: &mut String,
        prefix: &str,
        on_branch: &mut HashSet<NodeIndex>,
    ) {
        let deps = self.sorted_neighbors(node, Direction::Outgoing);
        for (i, &dep) in deps.iter().enumerate() {
            let is_last = i == deps.len() - 1;
            let connector = if is_last {
                "└── "
            } else {
                "├── "
            };
            let child_prefix = if is_last {
                format!("{prefix}    ")
            } else {
                format!("{prefix}│   ")
            };

            if on_branch.contains(&dep) {
                result.push_str(&format!(
                    "{prefix}{connector}{} (circular reference)\n",
                    self.graph[dep].relative_path
                ));
                continue;
            }

            result.push_str(&format!("{prefix}{connector}{}\n", self.graph[dep]));
            on_branch.insert(dep);
            self.build_tree_string(dep, result, &child_prefix, on_branch);
            on_branch.remove(&dep);
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
