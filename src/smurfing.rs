//! Smurfing detector: merchant whitelist, fan-in/fan-out, velocity bursts.
//!
//! Must run before the cycle, shell and mastermind detectors — the
//! merchant whitelist it computes is subtracted from every downstream
//! candidate set.

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use crate::config::DetectorConfig;
use crate::Transaction;

/// Smurfing patterns flagged per account. An account can carry more than
/// one (e.g. both `fan_in` and `high_velocity`).
pub type SmurfMap = HashMap<String, Vec<String>>;

pub struct SmurfingResult {
    pub merchant_whitelist: HashSet<String>,
    pub smurf_map: SmurfMap,
}

pub fn detect(transactions: &[Transaction], config: &DetectorConfig) -> SmurfingResult {
    let merchant_whitelist = compute_merchant_whitelist(transactions, config);

    let mut smurf_map: SmurfMap = HashMap::new();

    let mut receiver_senders: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut sender_receivers: HashMap<&str, HashSet<&str>> = HashMap::new();
    for t in transactions {
        receiver_senders
            .entry(&t.receiver_id)
            .or_default()
            .insert(&t.sender_id);
        sender_receivers
            .entry(&t.sender_id)
            .or_default()
            .insert(&t.receiver_id);
    }

    let mut fan_in: Vec<&str> = receiver_senders
        .iter()
        .filter(|(_, s)| s.len() >= config.min_fan_count)
        .map(|(a, _)| *a)
        .collect();
    fan_in.sort_unstable();
    for a in fan_in {
        if !merchant_whitelist.contains(a) {
            smurf_map.entry(a.to_string()).or_default().push("fan_in".to_string());
        }
    }

    let mut fan_out: Vec<&str> = sender_receivers
        .iter()
        .filter(|(_, r)| r.len() >= config.fan_out_threshold)
        .map(|(a, _)| *a)
        .collect();
    fan_out.sort_unstable();
    for a in fan_out {
        if !merchant_whitelist.contains(a) {
            smurf_map
                .entry(a.to_string())
                .or_default()
                .push("fan_out".to_string());
        }
    }

    let window = Duration::hours(config.velocity_window_hours);
    let mut by_receiver: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for t in transactions {
        if merchant_whitelist.contains(t.receiver_id.as_str()) {
            continue;
        }
        by_receiver.entry(&t.receiver_id).or_default().push(t);
    }
    let mut receivers: Vec<&str> = by_receiver.keys().copied().collect();
    receivers.sort_unstable();
    for acct in receivers {
        let mut group = by_receiver[acct].clone();
        if group.len() < config.velocity_tx_threshold {
            continue;
        }
        group.sort_by_key(|t| t.timestamp);
        if max_distinct_senders_in_window(&group, window) >= config.velocity_tx_threshold {
            smurf_map
                .entry(acct.to_string())
                .or_default()
                .push("high_velocity".to_string());
        }
    }

    SmurfingResult {
        merchant_whitelist,
        smurf_map,
    }
}

fn compute_merchant_whitelist(
    transactions: &[Transaction],
    config: &DetectorConfig,
) -> HashSet<String> {
    let mut counterparties: HashMap<&str, HashSet<&str>> = HashMap::new();
    for t in transactions {
        counterparties
            .entry(&t.sender_id)
            .or_default()
            .insert(&t.receiver_id);
        counterparties
            .entry(&t.receiver_id)
            .or_default()
            .insert(&t.sender_id);
    }
    counterparties
        .into_iter()
        .filter(|(_, peers)| peers.len() >= config.merchant_threshold)
        .map(|(a, _)| a.to_string())
        .collect()
}

/// Largest count of distinct senders seen in any `window`-wide slice of
/// `group`, which must already be sorted by timestamp.
fn max_distinct_senders_in_window(group: &[&Transaction], window: Duration) -> usize {
    let mut left = 0usize;
    let mut max_distinct = 0usize;
    for right in 0..group.len() {
        while group[right].timestamp - group[left].timestamp > window {
            left += 1;
        }
        let distinct: HashSet<&str> = group[left..=right]
            .iter()
            .map(|t| t.sender_id.as_str())
            .collect();
        max_distinct = max_distinct.max(distinct.len());
    }
    max_distinct
}
