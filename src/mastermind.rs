//! Mastermind detector: per ring, identifies the single account that
//! most plausibly controls the ring's outflows.
//!
//! The composite score blends betweenness centrality, out-degree and
//! outflow volume, all min-max normalized to `[0, 1]` within the ring's
//! own subgraph (normalization falls back to `0.5` uniformly when every
//! value in the set is equal — there's no meaningful ranking to make).
//! Weights are fixed at 0.10/0.50/0.40: betweenness is a weak signal on
//! hub-and-spoke topology (the hub is a path endpoint, not a waypoint),
//! so out-degree and volume carry most of the decision.

use std::collections::{HashMap, HashSet};

use crate::config;
use crate::graph::TransactionGraph;

pub struct MastermindEntry {
    pub account_id: String,
    pub mastermind_score: f64,
}

/// ring id -> identified mastermind, for rings that clear the 0.75
/// composite-score threshold.
pub fn detect(
    graph: &TransactionGraph,
    rings: &HashMap<String, HashSet<String>>,
) -> HashMap<String, MastermindEntry> {
    if rings.is_empty() {
        return HashMap::new();
    }

    let mut ring_count: HashMap<String, usize> = HashMap::new();
    for members in rings.values() {
        for m in members {
            *ring_count.entry(m.clone()).or_insert(0) += 1;
        }
    }

    let mut result = HashMap::new();
    for (rid, members) in rings {
        if config::all_legit_prefixed(members) {
            continue;
        }
        let sub = graph.induced_subgraph(members);
        if sub.node_count() <= 1 {
            continue;
        }

        let bc = normalize(betweenness_centrality(&sub));
        let od = normalize(
            members
                .iter()
                .map(|n| (n.clone(), sub.out_degree(n) as f64))
                .collect(),
        );
        let vol = normalize(
            members
                .iter()
                .map(|n| {
                    let out: f64 = sub
                        .successors_sorted(n)
                        .iter()
                        .map(|t| sub.edge_amount(n, t))
                        .sum();
                    (n.clone(), out)
                })
                .collect(),
        );

        let mut ordered: Vec<&String> = members.iter().collect();
        ordered.sort();

        let mut best: Option<&String> = None;
        let mut best_c = -1.0f64;
        for n in ordered {
            let c = bc.get(n).copied().unwrap_or(0.5) * 0.10
                + od.get(n).copied().unwrap_or(0.5) * 0.50
                + vol.get(n).copied().unwrap_or(0.5) * 0.40;
            if c > best_c {
                best_c = c;
                best = Some(n);
            }
        }

        let Some(best) = best else { continue };
        if best_c < 0.75 {
            continue;
        }

        let mut score = if best_c >= 0.90 {
            95.0 + ((best_c - 0.90) / 0.10) * 5.0
        } else if best_c >= 0.80 {
            85.0 + ((best_c - 0.80) / 0.10) * 10.0
        } else {
            75.0 + ((best_c - 0.70) / 0.10) * 10.0
        };
        score += (*ring_count.get(best).unwrap_or(&1) as f64 - 1.0) * 15.0;
        let score = (score.min(100.0) * 10.0).round() / 10.0;

        result.insert(
            rid.clone(),
            MastermindEntry {
                account_id: best.clone(),
                mastermind_score: score,
            },
        );
    }
    result
}

fn normalize(values: HashMap<String, f64>) -> HashMap<String, f64> {
    if values.is_empty() {
        return HashMap::new();
    }
    let min = values.values().cloned().fold(f64::INFINITY, f64::min);
    let max = values.values().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max > min {
        values
            .into_iter()
            .map(|(k, v)| (k, (v - min) / (max - min)))
            .collect()
    } else {
        values.into_keys().map(|k| (k, 0.5)).collect()
    }
}

/// Brandes' algorithm for unweighted directed betweenness centrality.
/// Raw (unnormalized by path count) — the caller min-max normalizes
/// afterward, which erases any constant scaling factor anyway.
fn betweenness_centrality(graph: &TransactionGraph) -> HashMap<String, f64> {
    let nodes: Vec<String> = graph.node_ids().cloned().collect();
    let mut centrality: HashMap<String, f64> = nodes.iter().map(|n| (n.clone(), 0.0)).collect();

    for s in &nodes {
        let mut stack: Vec<String> = Vec::new();
        let mut predecessors: HashMap<String, Vec<String>> =
            nodes.iter().map(|n| (n.clone(), Vec::new())).collect();
        let mut sigma: HashMap<String, f64> = nodes.iter().map(|n| (n.clone(), 0.0)).collect();
        let mut dist: HashMap<String, i64> = nodes.iter().map(|n| (n.clone(), -1)).collect();
        sigma.insert(s.clone(), 1.0);
        dist.insert(s.clone(), 0);

        let mut queue: std::collections::VecDeque<String> = std::collections::VecDeque::new();
        queue.push_back(s.clone());
        while let Some(v) = queue.pop_front() {
            stack.push(v.clone());
            for w in graph.successors_sorted(&v) {
                if dist[&w] < 0 {
                    dist.insert(w.clone(), dist[&v] + 1);
                    queue.push_back(w.clone());
                }
                if dist[&w] == dist[&v] + 1 {
                    let add = sigma[&v];
                    *sigma.get_mut(&w).unwrap() += add;
                    predecessors.get_mut(&w).unwrap().push(v.clone());
                }
            }
        }

        let mut delta: HashMap<String, f64> = nodes.iter().map(|n| (n.clone(), 0.0)).collect();
        while let Some(w) = stack.pop() {
            for v in &predecessors[&w] {
                let contrib = (sigma[v] / sigma[&w]) * (1.0 + delta[&w]);
                *delta.get_mut(v).unwrap() += contrib;
            }
            if &w != s {
                *centrality.get_mut(&w).unwrap() += delta[&w];
            }
        }
    }
    centrality
}
