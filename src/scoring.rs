//! Suspicion scorer: combines cycle, velocity, fan and shell signals
//! into a single per-account score, capped at 100.

use std::collections::HashMap;

use crate::cycles::CycleData;
use crate::shells::ShellMap;
use crate::smurfing::SmurfMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub total: f64,
    pub cycle_score: f64,
    pub velocity_score: f64,
    pub fan_score: f64,
    pub shell_score: f64,
}

/// Graph-wide stats computed once per analysis and shared across every
/// account's score computation.
pub struct PrecomputedStats {
    pub in_degrees: HashMap<String, usize>,
    pub out_degrees: HashMap<String, usize>,
    pub total_nodes: usize,
    /// account id -> max distinct senders seen in any velocity-window
    /// slice of its inbound transactions. Only populated for accounts
    /// under consideration (members of at least one detector's output).
    pub velocity_counts: HashMap<String, f64>,
}

pub fn compute(
    account_id: &str,
    cycle_data: &CycleData,
    smurf_map: &SmurfMap,
    shell_map: &ShellMap,
    pre: &PrecomputedStats,
    velocity_tx_threshold: usize,
) -> ScoreBreakdown {
    let in_d = *pre.in_degrees.get(account_id).unwrap_or(&0);
    let out_d = *pre.out_degrees.get(account_id).unwrap_or(&0);
    let n = pre.total_nodes;
    let vel = *pre.velocity_counts.get(account_id).unwrap_or(&0.0);

    let cycle_score = match cycle_data.member_cycles.get(account_id) {
        Some(cycles) if !cycles.is_empty() => {
            let min_len = cycles.iter().map(|c| c.len()).min().unwrap_or(0);
            if min_len <= 3 {
                40.0
            } else if min_len == 4 {
                35.0
            } else {
                30.0
            }
        }
        _ => 0.0,
    };

    let velocity_score = (vel / velocity_tx_threshold as f64 * 25.0).min(25.0);

    let mut fan_score = ((in_d + out_d) as f64 / (n * 2).max(1) as f64 * 200.0).min(20.0);
    if let Some(patterns) = smurf_map.get(account_id) {
        let fan_in = patterns.iter().any(|p| p == "fan_in");
        let fan_out = patterns.iter().any(|p| p == "fan_out");
        if fan_in && fan_out {
            fan_score = 20.0;
        } else if fan_in || fan_out {
            fan_score = fan_score.max(15.0);
        }
    }

    let chain_len = *shell_map.get(account_id).unwrap_or(&0);
    let shell_score = if chain_len >= 4 {
        15.0
    } else if chain_len == 3 {
        10.0
    } else if chain_len >= 1 {
        5.0
    } else {
        0.0
    };

    let total = (cycle_score + velocity_score + fan_score + shell_score).min(100.0);

    ScoreBreakdown {
        total: round2(total),
        cycle_score: round2(cycle_score),
        velocity_score: round2(velocity_score),
        fan_score: round2(fan_score),
        shell_score: round2(shell_score),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn empty_cycle_data() -> CycleData {
        CycleData {
            ring_map: HashMap::new(),
            rings: HashMap::new(),
            member_cycles: HashMap::new(),
            cycle_members: HashSet::new(),
        }
    }

    fn stats() -> PrecomputedStats {
        PrecomputedStats {
            in_degrees: HashMap::new(),
            out_degrees: HashMap::new(),
            total_nodes: 10,
            velocity_counts: HashMap::new(),
        }
    }

    #[test]
    fn triangle_member_scores_forty_cycle_points() {
        let mut cycle_data = empty_cycle_data();
        cycle_data
            .member_cycles
            .insert("A".to_string(), vec![vec!["A".into(), "B".into(), "C".into()]]);
        let score = compute("A", &cycle_data, &SmurfMap::new(), &ShellMap::new(), &stats(), 10);
        assert_eq!(score.cycle_score, 40.0);
    }

    #[test]
    fn both_fan_patterns_cap_fan_score_at_twenty() {
        let mut smurf_map = SmurfMap::new();
        smurf_map.insert("A".to_string(), vec!["fan_in".to_string(), "fan_out".to_string()]);
        let score = compute("A", &empty_cycle_data(), &smurf_map, &ShellMap::new(), &stats(), 10);
        assert_eq!(score.fan_score, 20.0);
    }

    #[test]
    fn four_hop_shell_scores_fifteen() {
        let mut shell_map = ShellMap::new();
        shell_map.insert("A".to_string(), 5);
        let score = compute("A", &empty_cycle_data(), &SmurfMap::new(), &shell_map, &stats(), 10);
        assert_eq!(score.shell_score, 15.0);
    }

    #[test]
    fn total_never_exceeds_one_hundred() {
        let mut cycle_data = empty_cycle_data();
        cycle_data
            .member_cycles
            .insert("A".to_string(), vec![vec!["A".into(), "B".into(), "C".into()]]);
        let mut smurf_map = SmurfMap::new();
        smurf_map.insert("A".to_string(), vec!["fan_in".to_string(), "fan_out".to_string()]);
        let mut shell_map = ShellMap::new();
        shell_map.insert("A".to_string(), 5);
        let mut pre = stats();
        pre.velocity_counts.insert("A".to_string(), 100.0);
        let score = compute("A", &cycle_data, &smurf_map, &shell_map, &pre, 10);
        assert!(score.total <= 100.0);
    }

    proptest::proptest! {
        #[test]
        fn total_is_always_bounded_and_equals_component_sum(
            cycle_len in 0usize..7,
            velocity in 0.0f64..500.0,
            shell_len in 0usize..8,
            fan_in in proptest::bool::ANY,
            fan_out in proptest::bool::ANY,
        ) {
            let mut cycle_data = empty_cycle_data();
            if cycle_len >= 3 {
                let cycle: Vec<String> = (0..cycle_len).map(|i| i.to_string()).collect();
                cycle_data.member_cycles.insert("A".to_string(), vec![cycle]);
            }
            let mut smurf_map = SmurfMap::new();
            let mut patterns = Vec::new();
            if fan_in { patterns.push("fan_in".to_string()); }
            if fan_out { patterns.push("fan_out".to_string()); }
            if !patterns.is_empty() {
                smurf_map.insert("A".to_string(), patterns);
            }
            let mut shell_map = ShellMap::new();
            if shell_len > 0 {
                shell_map.insert("A".to_string(), shell_len);
            }
            let mut pre = stats();
            pre.velocity_counts.insert("A".to_string(), velocity);

            let score = compute("A", &cycle_data, &smurf_map, &shell_map, &pre, 10);

            prop_assert!(score.total >= 0.0 && score.total <= 100.0);
            let sum = score.cycle_score + score.velocity_score + score.fan_score + score.shell_score;
            prop_assert!((score.total - sum.min(100.0)).abs() < 0.01);
        }
    }
}
