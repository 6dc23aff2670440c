//! Cycle detector: strongly-connected-component scoping, a global
//! search budget, bounded elementary cycle enumeration, amount gating
//! and ring assembly via union-find.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;

use crate::config::{self, DetectorConfig};
use crate::graph::TransactionGraph;
use crate::union_find::UnionFind;

pub struct CycleData {
    /// account id -> ring id, for accounts that ended up in a cycle ring.
    pub ring_map: HashMap<String, String>,
    /// ring id -> member account ids.
    pub rings: HashMap<String, HashSet<String>>,
    /// account id -> every raw elementary cycle it belongs to.
    pub member_cycles: HashMap<String, Vec<Vec<String>>>,
    /// every account that belongs to at least one raw cycle.
    pub cycle_members: HashSet<String>,
}

pub fn detect(
    graph: &TransactionGraph,
    merchant_whitelist: &HashSet<String>,
    config: &DetectorConfig,
) -> CycleData {
    let candidates: HashSet<String> = graph
        .node_ids()
        .filter(|id| graph.in_degree(id) > 0 && graph.out_degree(id) > 0)
        .cloned()
        .collect();

    let candidate_graph = graph.induced_subgraph(&candidates);
    let mut scc_nodes: HashSet<String> = HashSet::new();
    for scc in tarjan_scc(candidate_graph.inner()) {
        if scc.len() < 2 {
            continue;
        }
        let members: HashSet<String> = scc
            .iter()
            .map(|idx| candidate_graph.node_weight(*idx).to_string())
            .collect();
        scc_nodes.extend(trim_scc(&candidate_graph, members, config.max_scc_size));
    }

    for w in merchant_whitelist {
        scc_nodes.remove(w);
    }

    if scc_nodes.len() > config.max_cycle_search_nodes {
        scc_nodes = apply_search_budget(graph, scc_nodes, config.max_cycle_search_nodes);
    }

    let search_graph = graph.induced_subgraph(&scc_nodes);
    let raw = enumerate_cycles(&search_graph, config.min_cycle_length, config.max_cycle_length);

    let raw = raw
        .into_iter()
        .filter(|cycle| passes_amount_gate(&search_graph, cycle, config))
        .collect::<Vec<_>>();

    assemble_rings(raw)
}

/// Restricts an oversized SCC to its highest-degree members, computing
/// degree only over edges *within the SCC itself* (not the full graph).
/// Ties break on ascending account id for determinism.
fn trim_scc(graph: &TransactionGraph, nodes: HashSet<String>, max_size: usize) -> HashSet<String> {
    if nodes.len() <= max_size {
        return nodes;
    }
    let sub = graph.induced_subgraph(&nodes);
    let mut ranked: Vec<(String, usize)> = nodes
        .iter()
        .map(|n| (n.clone(), sub.in_degree(n) + sub.out_degree(n)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(max_size).map(|(n, _)| n).collect()
}

/// Caps the global cycle-search candidate set, pinning every fraud-prefixed
/// node and filling the remaining budget with the highest-degree (full
/// graph) survivors.
fn apply_search_budget(
    graph: &TransactionGraph,
    nodes: HashSet<String>,
    budget: usize,
) -> HashSet<String> {
    let pinned: HashSet<String> = nodes
        .iter()
        .filter(|n| config::is_fraud_prefixed(n))
        .cloned()
        .collect();
    let slots = budget.saturating_sub(pinned.len());

    let mut rest: Vec<(String, usize)> = nodes
        .iter()
        .filter(|n| !pinned.contains(*n))
        .map(|n| (n.clone(), graph.in_degree(n) + graph.out_degree(n)))
        .collect();
    rest.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut out = pinned;
    out.extend(rest.into_iter().take(slots).map(|(n, _)| n));
    out
}

/// Enumerates elementary cycles of length `min_len..=max_len` within
/// `graph`, anchored at each cycle's lexicographically-smallest member
/// to guarantee each cycle is produced exactly once.
fn enumerate_cycles(graph: &TransactionGraph, min_len: usize, max_len: usize) -> Vec<Vec<String>> {
    let mut ids: Vec<String> = graph.node_ids().cloned().collect();
    ids.sort();
    let rank: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();

    let mut out = Vec::new();
    for start in &ids {
        let mut path = vec![start.clone()];
        let mut visited: HashSet<String> = HashSet::from([start.clone()]);
        dfs_cycles(graph, &rank, start, start, &mut path, &mut visited, max_len, min_len, &mut out);
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn dfs_cycles(
    graph: &TransactionGraph,
    rank: &HashMap<&str, usize>,
    start: &str,
    current: &str,
    path: &mut Vec<String>,
    visited: &mut HashSet<String>,
    max_len: usize,
    min_len: usize,
    out: &mut Vec<Vec<String>>,
) {
    for next in graph.successors_sorted(current) {
        if next == start {
            if path.len() >= min_len {
                out.push(path.clone());
            }
            continue;
        }
        if path.len() >= max_len {
            continue;
        }
        if visited.contains(&next) {
            continue;
        }
        if rank[next.as_str()] <= rank[start] {
            continue;
        }
        visited.insert(next.clone());
        path.push(next.clone());
        dfs_cycles(graph, rank, start, &next, path, visited, max_len, min_len, out);
        path.pop();
        visited.remove(&next);
    }
}

fn passes_amount_gate(graph: &TransactionGraph, cycle: &[String], config: &DetectorConfig) -> bool {
    let n = cycle.len();
    let total: f64 = (0..n)
        .map(|i| graph.edge_amount(&cycle[i], &cycle[(i + 1) % n]))
        .sum();
    let avg = total / n as f64;

    let has_fraud = cycle.iter().any(|c| config::is_fraud_prefixed(c));
    let all_legit = config::all_legit_prefixed(cycle);

    let mut min_amount = config.min_cycle_amount;
    if all_legit {
        min_amount *= 3.0;
        if avg < 25_000.0 {
            return false;
        }
    } else if has_fraud {
        min_amount *= 0.5;
    }

    total >= min_amount
}

fn assemble_rings(raw: Vec<Vec<String>>) -> CycleData {
    let mut uf = UnionFind::new();
    for cycle in &raw {
        for n in &cycle[1..] {
            uf.union(&cycle[0], n);
        }
    }

    let all_members: HashSet<String> = raw.iter().flatten().cloned().collect();
    let mut groups: HashMap<String, HashSet<String>> = HashMap::new();
    for n in &all_members {
        groups.entry(uf.find(n)).or_default().insert(n.clone());
    }

    let mut ordered: Vec<HashSet<String>> = groups.into_values().collect();
    ordered.sort_by(|a, b| {
        let min_a = a.iter().min().cloned().unwrap_or_default();
        let min_b = b.iter().min().cloned().unwrap_or_default();
        min_a.cmp(&min_b)
    });

    let mut ring_map = HashMap::new();
    let mut rings = HashMap::new();
    for (i, members) in ordered.into_iter().enumerate() {
        let rid = format!("RING_{:03}", i + 1);
        for m in &members {
            ring_map.insert(m.clone(), rid.clone());
        }
        rings.insert(rid, members);
    }

    let mut member_cycles: HashMap<String, Vec<Vec<String>>> = HashMap::new();
    for cycle in &raw {
        for n in cycle {
            member_cycles.entry(n.clone()).or_default().push(cycle.clone());
        }
    }

    CycleData {
        ring_map,
        rings,
        member_cycles,
        cycle_members: all_members,
    }
}
