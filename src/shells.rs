//! Shell-chain detector: low-activity pass-through accounts strung
//! together into a chain.
//!
//! A potential-shell node has in-degree exactly 1 and out-degree at
//! least 1, and has appeared in at most `shell_max_tx_count` raw
//! transactions. Chains are walked backward then forward from every
//! such candidate.
//!
//! The backward walk's predecessor is always unambiguous (in-degree 1
//! by construction), so no ordering choice is needed there. The forward
//! walk's successor is not unambiguous in general — ties are broken by
//! ascending account id. When the backward walk meets a non-candidate
//! predecessor, that predecessor is prepended to the chain and the walk
//! stops; this node can surface in the accepted chain without itself
//! being a shell. That is expected, not a bug.

use std::collections::{HashMap, HashSet};

use crate::config::DetectorConfig;
use crate::graph::TransactionGraph;
use crate::Transaction;

/// account id -> length of the shell chain it was found in.
pub type ShellMap = HashMap<String, usize>;

pub fn detect(
    graph: &TransactionGraph,
    transactions: &[Transaction],
    merchant_whitelist: &HashSet<String>,
    cycle_members: &HashSet<String>,
    config: &DetectorConfig,
) -> ShellMap {
    let mut tx_count: HashMap<&str, usize> = HashMap::new();
    for t in transactions {
        *tx_count.entry(t.sender_id.as_str()).or_insert(0) += 1;
        *tx_count.entry(t.receiver_id.as_str()).or_insert(0) += 1;
    }

    let candidates: HashSet<String> = tx_count
        .into_iter()
        .filter(|(_, count)| *count >= 1 && *count <= config.shell_max_tx_count)
        .map(|(id, _)| id.to_string())
        .filter(|id| !merchant_whitelist.contains(id) && !cycle_members.contains(id))
        .collect();

    let potential: HashSet<String> = candidates
        .into_iter()
        .filter(|id| graph.contains(id) && graph.in_degree(id) == 1 && graph.out_degree(id) >= 1)
        .collect();

    let mut shell_map: ShellMap = HashMap::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut ordered: Vec<String> = potential.iter().cloned().collect();
    ordered.sort();

    for start in &ordered {
        if seen.contains(start) {
            continue;
        }
        let mut segment: Vec<String> = walk_backward(graph, &potential, start);
        walk_forward(graph, &potential, &mut segment);

        if segment.len() >= 4 {
            let shells: Vec<&String> = segment.iter().filter(|n| potential.contains(*n)).collect();
            if shells.len() >= 2 {
                for n in shells {
                    shell_map.insert(n.clone(), segment.len());
                    seen.insert(n.clone());
                }
            }
        }
    }

    shell_map
}

fn walk_backward(graph: &TransactionGraph, potential: &HashSet<String>, start: &str) -> Vec<String> {
    let mut segment: Vec<String> = Vec::new();
    let mut current = start.to_string();
    loop {
        if !(potential.contains(&current) && !segment.contains(&current)) {
            break;
        }
        segment.insert(0, current.clone());
        let preds = graph.predecessors_sorted(&current);
        let Some(prev) = preds.first() else {
            break;
        };
        if potential.contains(prev) {
            current = prev.clone();
        } else {
            segment.insert(0, prev.clone());
            break;
        }
    }
    segment
}

fn walk_forward(graph: &TransactionGraph, potential: &HashSet<String>, segment: &mut Vec<String>) {
    let mut current = segment.last().cloned().unwrap_or_default();
    loop {
        let succs = graph.successors_sorted(&current);
        let Some(next) = succs.first() else {
            break;
        };
        if potential.contains(next) && !segment.contains(next) {
            segment.push(next.clone());
            current = next.clone();
        } else {
            segment.push(next.clone());
            break;
        }
    }
}
