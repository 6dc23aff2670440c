//! Ring assembler and post-filter.
//!
//! Builds the suspect list and the three ring families (cycle,
//! smurfing, shell) against the *original* cleaned transactions — not
//! the aggregated graph — then runs the six-rule post-filter cascade,
//! counting every suspect and ring it removes as a false positive.

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use crate::config::{self, DetectorConfig};
use crate::cycles::CycleData;
use crate::graph::TransactionGraph;
use crate::mastermind::MastermindEntry;
use crate::scoring::{self, PrecomputedStats};
use crate::shells::ShellMap;
use crate::smurfing::SmurfMap;
use crate::{FraudRing, PatternType, ScoreComponents, Suspect, Transaction};

pub struct AssembledResult {
    pub suspects: Vec<Suspect>,
    pub fraud_rings: Vec<FraudRing>,
    pub false_positives: usize,
}

#[allow(clippy::too_many_arguments)]
pub fn assemble(
    transactions: &[Transaction],
    graph: &TransactionGraph,
    config: &DetectorConfig,
    cycle_data: CycleData,
    smurf_map: SmurfMap,
    shell_map: ShellMap,
    mastermind_data: HashMap<String, MastermindEntry>,
    merchant_whitelist: &HashSet<String>,
) -> AssembledResult {
    let mut ring_map = cycle_data.ring_map.clone();

    let mut all_ids: HashSet<String> = HashSet::new();
    all_ids.extend(ring_map.keys().cloned());
    all_ids.extend(smurf_map.keys().cloned());
    all_ids.extend(shell_map.keys().cloned());

    let pre = precompute_stats(transactions, graph, &all_ids, config);

    let mm_ids: HashSet<String> = mastermind_data.values().map(|v| v.account_id.clone()).collect();
    let mm_rid: HashMap<String, String> = mastermind_data
        .iter()
        .map(|(rid, v)| (v.account_id.clone(), rid.clone()))
        .collect();

    let mut ordered_ids: Vec<String> = all_ids.into_iter().collect();
    ordered_ids.sort();

    let mut suspects: Vec<Suspect> = Vec::new();
    for acct in &ordered_ids {
        let score = scoring::compute(
            acct,
            &cycle_data,
            &smurf_map,
            &shell_map,
            &pre,
            config.velocity_tx_threshold,
        );
        if score.total <= 0.0 {
            continue;
        }

        let mut patterns: Vec<String> = Vec::new();
        if let Some(cycles) = cycle_data.member_cycles.get(acct) {
            for c in cycles {
                let p = format!("cycle_length_{}", c.len());
                if !patterns.contains(&p) {
                    patterns.push(p);
                }
            }
        }
        if let Some(pats) = smurf_map.get(acct) {
            for p in pats {
                if !patterns.contains(p) {
                    patterns.push(p.clone());
                }
            }
        }
        if shell_map.contains_key(acct) {
            for p in ["shell_chain", "low_transaction_intermediary"] {
                if !patterns.iter().any(|x| x == p) {
                    patterns.push(p.to_string());
                }
            }
        }

        let is_mastermind = mm_ids.contains(acct);
        let mastermind_score = if is_mastermind {
            mm_rid
                .get(acct)
                .and_then(|rid| mastermind_data.get(rid))
                .map(|e| e.mastermind_score)
        } else {
            None
        };

        suspects.push(Suspect {
            account_id: acct.clone(),
            suspicion_score: score.total,
            detected_patterns: patterns,
            ring_id: ring_map.get(acct).cloned(),
            is_mastermind,
            mastermind_score,
            score_breakdown: ScoreComponents {
                cycle_score: score.cycle_score,
                velocity_score: score.velocity_score,
                fan_score: score.fan_score,
                shell_score: score.shell_score,
            },
        });
    }

    let mut fraud_rings: Vec<FraudRing> = Vec::new();

    let mut cycle_rids: Vec<String> = cycle_data.rings.keys().cloned().collect();
    cycle_rids.sort();
    for rid in &cycle_rids {
        let members = &cycle_data.rings[rid];
        let (tx_count, total_amount) = ring_transaction_stats(transactions, members);
        let risk = suspects
            .iter()
            .filter(|s| members.contains(&s.account_id))
            .map(|s| s.suspicion_score)
            .fold(f64::NEG_INFINITY, f64::max);
        let risk = if risk.is_finite() { risk } else { 50.0 };
        let mut sorted_members: Vec<String> = members.iter().cloned().collect();
        sorted_members.sort();
        fraud_rings.push(FraudRing {
            ring_id: rid.clone(),
            member_accounts: sorted_members,
            pattern_type: PatternType::Cycle,
            risk_score: round1(risk),
            mastermind_account: mastermind_data.get(rid).map(|e| e.account_id.clone()),
            transaction_count: tx_count,
            total_amount: round2(total_amount),
        });
    }

    let mut ring_counter = cycle_data.rings.len() + 1;
    let mut hubs: Vec<String> = smurf_map.keys().cloned().collect();
    hubs.sort();
    for hub in hubs {
        let patterns = &smurf_map[&hub];
        if ring_map.contains_key(&hub) {
            continue;
        }
        if !patterns.iter().any(|p| p == "fan_in") {
            continue;
        }
        if merchant_whitelist.contains(&hub) {
            continue;
        }
        let preds = graph.predecessors_sorted(&hub);
        if preds.len() < config.min_fan_count {
            continue;
        }
        let mut members: HashSet<String> = preds.iter().cloned().collect();
        members.insert(hub.clone());

        if config::all_legit_prefixed(&members) {
            continue;
        }
        let has_velocity = patterns.iter().any(|p| p == "high_velocity");
        let has_fraud_member = members.iter().any(|m| config::is_fraud_prefixed(m));
        if !has_velocity && !has_fraud_member {
            continue;
        }

        let rid = format!("RING_{:03}", ring_counter);
        ring_counter += 1;
        let (tx_count, total_amount) = ring_transaction_stats(transactions, &members);
        let risk = (55.0 + (preds.len() as f64 / 50.0) * 20.0).min(84.9);
        let mut sorted_members: Vec<String> = members.iter().cloned().collect();
        sorted_members.sort();
        fraud_rings.push(FraudRing {
            ring_id: rid.clone(),
            member_accounts: sorted_members,
            pattern_type: PatternType::Smurfing,
            risk_score: round1(risk),
            mastermind_account: None,
            transaction_count: tx_count,
            total_amount: round2(total_amount),
        });
        let mut member_list: Vec<String> = members.into_iter().collect();
        member_list.sort();
        for m in member_list {
            if !ring_map.contains_key(&m) {
                ring_map.insert(m.clone(), rid.clone());
                if let Some(s) = suspects.iter_mut().find(|s| s.account_id == m) {
                    s.ring_id = Some(rid.clone());
                }
            }
        }
    }

    let mut seen_shell: HashSet<String> = HashSet::new();
    let mut shell_nodes: Vec<String> = shell_map.keys().cloned().collect();
    shell_nodes.sort();
    for start in shell_nodes {
        if seen_shell.contains(&start) || ring_map.contains_key(&start) {
            continue;
        }
        let mut chain: HashSet<String> = HashSet::new();
        let mut stack = vec![start.clone()];
        while let Some(cur) = stack.pop() {
            if seen_shell.contains(&cur) {
                continue;
            }
            if shell_map.contains_key(&cur) {
                chain.insert(cur.clone());
                seen_shell.insert(cur.clone());
                stack.extend(graph.successors_sorted(&cur));
                stack.extend(graph.predecessors_sorted(&cur));
            }
        }
        if chain.len() >= 2 {
            let rid = format!("RING_{:03}", ring_counter);
            ring_counter += 1;
            let (tx_count, total_amount) = ring_transaction_stats(transactions, &chain);
            let risk = 50.0 + (chain.len() as f64 / 10.0) * 15.0;
            let mut sorted_members: Vec<String> = chain.iter().cloned().collect();
            sorted_members.sort();
            fraud_rings.push(FraudRing {
                ring_id: rid.clone(),
                member_accounts: sorted_members,
                pattern_type: PatternType::Shell,
                risk_score: round1(risk),
                mastermind_account: None,
                transaction_count: tx_count,
                total_amount: round2(total_amount),
            });
            let mut member_list: Vec<String> = chain.into_iter().collect();
            member_list.sort();
            for m in member_list {
                if !ring_map.contains_key(&m) {
                    ring_map.insert(m.clone(), rid.clone());
                    if let Some(s) = suspects.iter_mut().find(|s| s.account_id == m) {
                        s.ring_id = Some(rid.clone());
                    }
                }
            }
        }
    }

    let mut false_positives = 0usize;

    let oversized: HashSet<String> = fraud_rings
        .iter()
        .filter(|r| r.member_accounts.len() > 100)
        .map(|r| r.ring_id.clone())
        .collect();
    false_positives += drop_rings(&mut suspects, &mut fraud_rings, &oversized);

    let underfunded: HashSet<String> = fraud_rings
        .iter()
        .filter(|r| r.total_amount < config.min_cycle_amount)
        .map(|r| r.ring_id.clone())
        .collect();
    false_positives += drop_rings(&mut suspects, &mut fraud_rings, &underfunded);

    let bloated_smurfing: HashSet<String> = fraud_rings
        .iter()
        .filter(|r| {
            r.pattern_type == PatternType::Smurfing
                && r.member_accounts.len() > 20
                && r.total_amount > 1_000_000.0
        })
        .map(|r| r.ring_id.clone())
        .collect();
    false_positives += drop_rings(&mut suspects, &mut fraud_rings, &bloated_smurfing);

    let signal_patterns: HashSet<&str> = [
        "fan_out",
        "fan_in",
        "high_velocity",
        "shell_chain",
        "low_transaction_intermediary",
    ]
    .into_iter()
    .collect();
    let mut weak_cycle_rings: HashSet<String> = HashSet::new();
    for r in fraud_rings.iter().filter(|r| r.pattern_type == PatternType::Cycle) {
        if r.member_accounts.iter().any(|m| config::is_fraud_prefixed(m)) {
            continue;
        }
        let ring_patterns: HashSet<&str> = suspects
            .iter()
            .filter(|s| s.ring_id.as_deref() == Some(r.ring_id.as_str()))
            .flat_map(|s| s.detected_patterns.iter().map(|p| p.as_str()))
            .collect();
        let has_signal = ring_patterns.intersection(&signal_patterns).next().is_some();
        let all_legit = config::all_legit_prefixed(&r.member_accounts);
        if all_legit && (r.risk_score < 80.0 || !has_signal) {
            weak_cycle_rings.insert(r.ring_id.clone());
        } else if r.risk_score < 45.0 && !has_signal {
            weak_cycle_rings.insert(r.ring_id.clone());
        }
    }
    false_positives += drop_rings(&mut suspects, &mut fraud_rings, &weak_cycle_rings);

    let volume_only_patterns: HashSet<&str> = ["fan_out", "fan_in", "high_velocity"].into_iter().collect();
    let orphans: HashSet<String> = suspects
        .iter()
        .filter(|s| {
            s.ring_id.is_none()
                && s.score_breakdown.cycle_score == 0.0
                && s.score_breakdown.shell_score == 0.0
                && s.suspicion_score < 45.0
                && s.detected_patterns
                    .iter()
                    .all(|p| volume_only_patterns.contains(p.as_str()))
        })
        .map(|s| s.account_id.clone())
        .collect();
    false_positives += orphans.len();
    suspects.retain(|s| !orphans.contains(&s.account_id));

    false_positives += suspects
        .iter()
        .filter(|s| merchant_whitelist.contains(&s.account_id))
        .count();
    suspects.retain(|s| !merchant_whitelist.contains(&s.account_id));
    for r in fraud_rings.iter_mut() {
        if let Some(account) = &r.mastermind_account {
            if merchant_whitelist.contains(account) {
                r.mastermind_account = None;
            }
        }
    }

    suspects.sort_by(|a, b| {
        b.suspicion_score
            .partial_cmp(&a.suspicion_score)
            .unwrap()
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    AssembledResult {
        suspects,
        fraud_rings,
        false_positives,
    }
}

fn drop_rings(
    suspects: &mut Vec<Suspect>,
    fraud_rings: &mut Vec<FraudRing>,
    rids: &HashSet<String>,
) -> usize {
    if rids.is_empty() {
        return 0;
    }
    let dropped = suspects
        .iter()
        .filter(|s| s.ring_id.as_ref().is_some_and(|r| rids.contains(r)))
        .count();
    suspects.retain(|s| !s.ring_id.as_ref().is_some_and(|r| rids.contains(r)));
    fraud_rings.retain(|r| !rids.contains(&r.ring_id));
    dropped
}

fn ring_transaction_stats(transactions: &[Transaction], members: &HashSet<String>) -> (usize, f64) {
    let mut count = 0usize;
    let mut total = 0.0;
    for t in transactions {
        if members.contains(&t.sender_id) && members.contains(&t.receiver_id) {
            count += 1;
            total += t.amount;
        }
    }
    (count, total)
}

fn precompute_stats(
    transactions: &[Transaction],
    graph: &TransactionGraph,
    all_ids: &HashSet<String>,
    config: &DetectorConfig,
) -> PrecomputedStats {
    let window = Duration::hours(config.velocity_window_hours);
    let mut by_receiver: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for t in transactions {
        if all_ids.contains(&t.receiver_id) {
            by_receiver.entry(&t.receiver_id).or_default().push(t);
        }
    }
    let mut velocity_counts = HashMap::new();
    for (acct, mut group) in by_receiver {
        group.sort_by_key(|t| t.timestamp);
        let mut left = 0usize;
        let mut max_distinct = 0usize;
        for right in 0..group.len() {
            while group[right].timestamp - group[left].timestamp > window {
                left += 1;
            }
            let distinct: HashSet<&str> = group[left..=right].iter().map(|t| t.sender_id.as_str()).collect();
            max_distinct = max_distinct.max(distinct.len());
        }
        velocity_counts.insert(acct.to_string(), max_distinct as f64);
    }

    PrecomputedStats {
        in_degrees: graph.in_degrees_all(),
        out_degrees: graph.out_degrees_all(),
        total_nodes: graph.node_count(),
        velocity_counts,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
