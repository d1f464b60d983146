//! Dependency graph building and topological sorting.
//!
//! Nodes are keyed by unique_id. Edges run from dependency to dependent so
//! topological order yields dependencies first.

use crate::error::{CoreError, CoreResult};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// A directed acyclic graph over manifest nodes
#[derive(Debug, Default)]
pub struct NodeDag {
    /// The underlying graph, node weights are unique ids
    graph: DiGraph<String, ()>,

    /// Map from unique id to node index
    node_map: HashMap<String, NodeIndex>,
}

impl NodeDag {
    /// Create a new empty DAG
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Add a node to the DAG, returning its index (idempotent)
    pub fn add_node(&mut self, unique_id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(unique_id) {
            idx
        } else {
            let idx = self.graph.add_node(unique_id.to_string());
            self.node_map.insert(unique_id.to_string(), idx);
            idx
        }
    }

    /// Add a dependency edge (`from` depends on `to`)
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        // Edge goes dependency -> dependent so toposort yields
        // dependencies first
        self.graph.add_edge(to_idx, from_idx, ());
    }

    /// Build the DAG from a map of unique id -> dependency ids.
    ///
    /// Edges pointing at ids absent from the map (sources with no node of
    /// their own, disabled upstreams already reported elsewhere) are
    /// skipped rather than invented.
    pub fn build(dependencies: &HashMap<String, Vec<String>>) -> CoreResult<Self> {
        let mut dag = Self::new();

        for id in dependencies.keys() {
            dag.add_node(id);
        }

        for (id, deps) in dependencies {
            for dep in deps {
                if dependencies.contains_key(dep) {
                    dag.add_dependency(id, dep);
                }
            }
        }

        dag.validate()?;

        Ok(dag)
    }

    /// Validate the DAG has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Reconstruct a cycle path for error reporting, using short node
    /// names (the last unique-id segment) for readability.
    ///
    /// The walk follows depends-on edges inside the strongly connected
    /// component holding `start`, so `a` depending on `b` depending on
    /// `c` depending on `a` reads `a -> b -> c -> a`.
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let scc: HashSet<NodeIndex> = tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&start))
            .unwrap_or_default()
            .into_iter()
            .collect();

        let mut trail = vec![start];
        let mut visited = HashSet::new();
        visited.insert(start);
        if self.walk_cycle(start, start, &scc, &mut visited, &mut trail) {
            trail.push(start);
        }

        trail
            .iter()
            .map(|idx| display_name(&self.graph[*idx]))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// DFS over a node's dependencies, confined to `scc`, until the walk
    /// closes back on `start`. `trail` holds the path taken so far.
    fn walk_cycle(
        &self,
        current: NodeIndex,
        start: NodeIndex,
        scc: &HashSet<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
        trail: &mut Vec<NodeIndex>,
    ) -> bool {
        for edge in self
            .graph
            .edges_directed(current, petgraph::Direction::Incoming)
        {
            let dependency = edge.source();
            if !scc.contains(&dependency) {
                continue;
            }
            if dependency == start {
                return true;
            }
            if visited.insert(dependency) {
                trail.push(dependency);
                if self.walk_cycle(dependency, start, scc, visited, trail) {
                    return true;
                }
                trail.pop();
            }
        }
        false
    }

    /// Unique ids in topological order (dependencies first)
    pub fn topological_order(&self) -> CoreResult<Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Unique ids in reverse topological order (dependents first)
    pub fn reverse_topological_order(&self) -> CoreResult<Vec<String>> {
        let mut order = self.topological_order()?;
        order.reverse();
        Ok(order)
    }

    /// Direct dependencies of a node
    pub fn dependencies(&self, unique_id: &str) -> Vec<String> {
        if let Some(&idx) = self.node_map.get(unique_id) {
            self.graph
                .edges_directed(idx, petgraph::Direction::Incoming)
                .map(|e| self.graph[e.source()].clone())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Direct dependents of a node
    pub fn dependents(&self, unique_id: &str) -> Vec<String> {
        if let Some(&idx) = self.node_map.get(unique_id) {
            self.graph
                .edges_directed(idx, petgraph::Direction::Outgoing)
                .map(|e| self.graph[e.target()].clone())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// All transitive dependencies of a node
    pub fn ancestors(&self, unique_id: &str) -> Vec<String> {
        if let Some(&idx) = self.node_map.get(unique_id) {
            self.collect_reachable(idx, petgraph::Direction::Incoming)
        } else {
            Vec::new()
        }
    }

    /// Ancestors up to `max_depth` hops away (BFS)
    pub fn ancestors_bounded(&self, unique_id: &str, max_depth: usize) -> Vec<String> {
        self.traverse_bfs_bounded(unique_id, petgraph::Direction::Incoming, max_depth)
    }

    /// All transitive dependents of a node
    pub fn descendants(&self, unique_id: &str) -> Vec<String> {
        if let Some(&idx) = self.node_map.get(unique_id) {
            self.collect_reachable(idx, petgraph::Direction::Outgoing)
        } else {
            Vec::new()
        }
    }

    /// Descendants up to `max_depth` hops away (BFS)
    pub fn descendants_bounded(&self, unique_id: &str, max_depth: usize) -> Vec<String> {
        self.traverse_bfs_bounded(unique_id, petgraph::Direction::Outgoing, max_depth)
    }

    fn collect_reachable(&self, start: NodeIndex, direction: petgraph::Direction) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        self.collect_reachable_dfs(start, direction, &mut result, &mut visited);
        result
    }

    fn collect_reachable_dfs(
        &self,
        idx: NodeIndex,
        direction: petgraph::Direction,
        result: &mut Vec<String>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        for edge in self.graph.edges_directed(idx, direction) {
            let neighbor = match direction {
                petgraph::Direction::Incoming => edge.source(),
                petgraph::Direction::Outgoing => edge.target(),
            };
            if visited.insert(neighbor) {
                result.push(self.graph[neighbor].clone());
                self.collect_reachable_dfs(neighbor, direction, result, visited);
            }
        }
    }

    fn traverse_bfs_bounded(
        &self,
        unique_id: &str,
        direction: petgraph::Direction,
        max_depth: usize,
    ) -> Vec<String> {
        let Some(&start) = self.node_map.get(unique_id) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back((start, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in self.graph.edges_directed(current, direction) {
                let neighbor = match direction {
                    petgraph::Direction::Incoming => edge.source(),
                    petgraph::Direction::Outgoing => edge.target(),
                };
                if visited.insert(neighbor) {
                    result.push(self.graph[neighbor].clone());
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        result
    }

    /// All unique ids in the DAG
    pub fn node_ids(&self) -> Vec<String> {
        self.node_map.keys().cloned().collect()
    }

    /// Check if a node exists in the DAG
    pub fn contains(&self, unique_id: &str) -> bool {
        self.node_map.contains_key(unique_id)
    }
}

/// Short display name for a unique id: the last dot-separated segment.
fn display_name(unique_id: &str) -> String {
    unique_id
        .rsplit('.')
        .next()
        .unwrap_or(unique_id)
        .to_string()
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
