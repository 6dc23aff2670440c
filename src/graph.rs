//! The aggregated directed transaction graph.
//!
//! Many raw transactions between the same ordered pair of accounts
//! collapse into a single edge carrying the summed amount. Self-transfers
//! never produce an edge.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::Transaction;

#[derive(Debug, Default)]
pub struct TransactionGraph {
    graph: DiGraph<String, f64>,
    index: HashMap<String, NodeIndex>,
}

impl TransactionGraph {
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();
        let mut sums: HashMap<(NodeIndex, NodeIndex), f64> = HashMap::new();

        for t in transactions {
            if t.sender_id == t.receiver_id {
                continue;
            }
            let s = *index
                .entry(t.sender_id.clone())
                .or_insert_with(|| graph.add_node(t.sender_id.clone()));
            let r = *index
                .entry(t.receiver_id.clone())
                .or_insert_with(|| graph.add_node(t.receiver_id.clone()));
            *sums.entry((s, r)).or_insert(0.0) += t.amount;
        }
        for ((s, r), amount) in sums {
            graph.add_edge(s, r, amount);
        }
        Self { graph, index }
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.graph.node_weights()
    }

    pub fn in_degree(&self, id: &str) -> usize {
        match self.node_index(id) {
            Some(n) => self
                .graph
                .neighbors_directed(n, Direction::Incoming)
                .count(),
            None => 0,
        }
    }

    pub fn out_degree(&self, id: &str) -> usize {
        match self.node_index(id) {
            Some(n) => self
                .graph
                .neighbors_directed(n, Direction::Outgoing)
                .count(),
            None => 0,
        }
    }

    pub fn in_degrees_all(&self) -> HashMap<String, usize> {
        self.graph
            .node_indices()
            .map(|n| {
                (
                    self.graph[n].clone(),
                    self.graph.neighbors_directed(n, Direction::Incoming).count(),
                )
            })
            .collect()
    }

    pub fn out_degrees_all(&self) -> HashMap<String, usize> {
        self.graph
            .node_indices()
            .map(|n| {
                (
                    self.graph[n].clone(),
                    self.graph.neighbors_directed(n, Direction::Outgoing).count(),
                )
            })
            .collect()
    }

    pub fn predecessors_sorted(&self, id: &str) -> Vec<String> {
        let Some(n) = self.node_index(id) else {
            return Vec::new();
        };
        let mut v: Vec<String> = self
            .graph
            .neighbors_directed(n, Direction::Incoming)
            .map(|p| self.graph[p].clone())
            .collect();
        v.sort();
        v
    }

    pub fn successors_sorted(&self, id: &str) -> Vec<String> {
        let Some(n) = self.node_index(id) else {
            return Vec::new();
        };
        let mut v: Vec<String> = self
            .graph
            .neighbors_directed(n, Direction::Outgoing)
            .map(|s| self.graph[s].clone())
            .collect();
        v.sort();
        v
    }

    pub fn edge_amount(&self, from: &str, to: &str) -> f64 {
        let (Some(a), Some(b)) = (self.node_index(from), self.node_index(to)) else {
            return 0.0;
        };
        self.graph
            .edges_connecting(a, b)
            .next()
            .map(|e| *e.weight())
            .unwrap_or(0.0)
    }

    /// Builds a fresh graph containing only `nodes` and the edges between
    /// them, for algorithms (SCC, cycle enumeration) that must not see
    /// edges leaving the candidate set.
    pub fn induced_subgraph(&self, nodes: &std::collections::HashSet<String>) -> TransactionGraph {
        let mut graph = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();
        for id in nodes {
            let n = graph.add_node(id.clone());
            index.insert(id.clone(), n);
        }
        for id in nodes {
            let Some(from) = self.node_index(id) else {
                continue;
            };
            for e in self.graph.edges_directed(from, Direction::Outgoing) {
                let to_id = &self.graph[e.target()];
                if let Some(&to) = index.get(to_id) {
                    graph.add_edge(index[id], to, *e.weight());
                }
            }
        }
        TransactionGraph { graph, index }
    }

    pub fn node_weight(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn inner(&self) -> &DiGraph<String, f64> {
        &self.graph
    }
}
