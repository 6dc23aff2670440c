//! # Mule Ring Detector
//!
//! A deterministic, batch-oriented detector for money-muling rings in a
//! ledger of peer-to-peer transactions.
//!
//! ## Features
//!
//! - **Smurfing detection**: fan-in hubs, fan-out dispersers and velocity
//!   bursts, with a volume-based merchant whitelist to suppress legitimate
//!   high-fan-out businesses.
//! - **Circular transfer detection**: strongly-connected-component scoping,
//!   a bounded elementary-cycle search and amount gating.
//! - **Shell chain detection**: low-activity pass-through accounts strung
//!   into a chain between a funding source and a cash-out destination.
//! - **Mastermind identification**: per-ring betweenness/out-degree/volume
//!   scoring to name the account most likely directing a ring.
//! - **Six-rule post-filter**: drops oversized, underfunded and
//!   weak-signal rings before the result is returned.
//!
//! Every run is independent: a fresh [`MoneyMuleDetector`] carries no
//! state between calls to [`MoneyMuleDetector::run`], so the merchant
//! whitelist computed for one batch can never leak into the next.

pub mod collaborators;
pub mod config;
pub mod cycles;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod mastermind;
pub mod rings;
pub mod scoring;
pub mod shells;
pub mod smurfing;
pub mod union_find;

pub use config::DetectorConfig;
pub use error::PipelineError;

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single cleaned transaction row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-account breakdown of a [`Suspect`]'s suspicion score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreComponents {
    pub cycle_score: f64,
    pub velocity_score: f64,
    pub fan_score: f64,
    pub shell_score: f64,
}

/// An account flagged by at least one detector, after the post-filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suspect {
    pub account_id: String,
    pub suspicion_score: f64,
    pub detected_patterns: Vec<String>,
    pub ring_id: Option<String>,
    pub is_mastermind: bool,
    pub mastermind_score: Option<f64>,
    pub score_breakdown: ScoreComponents,
}

/// The detection pattern that produced a [`FraudRing`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Cycle,
    Smurfing,
    Shell,
}

/// A ring of accounts, assembled from the raw detector output and
/// surviving the post-filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FraudRing {
    pub ring_id: String,
    pub member_accounts: Vec<String>,
    pub pattern_type: PatternType,
    pub risk_score: f64,
    pub mastermind_account: Option<String>,
    pub transaction_count: usize,
    pub total_amount: f64,
}

/// Headline counts for one analysis run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub mastermind_accounts_identified: usize,
    pub processing_time_seconds: f64,
    pub false_positives_filtered: usize,
}

/// The complete result of one [`MoneyMuleDetector::run`] call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub timestamp: String,
    pub suspicious_accounts: Vec<Suspect>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: Summary,
}

impl AnalysisResult {
    /// Export as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// The money-muling ring detector.
///
/// Stateless across runs by construction: [`run`](Self::run) takes
/// `&self` and every intermediate whitelist, graph and score map lives
/// only for the duration of that call.
#[derive(Debug, Clone, Default)]
pub struct MoneyMuleDetector {
    config: DetectorConfig,
}

impl MoneyMuleDetector {
    /// Creates a detector with the default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detector with custom tuning.
    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Parses a CSV byte buffer into cleaned transactions.
    pub fn parse(csv_bytes: &[u8]) -> Result<Vec<Transaction>, PipelineError> {
        ingest::parse(csv_bytes)
    }

    /// Runs the full detection pipeline over `transactions`.
    pub fn run(&self, transactions: &[Transaction]) -> AnalysisResult {
        let started = Instant::now();
        let analysis_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("analysis", analysis_id = %analysis_id);
        let _enter = span.enter();

        let clean = transactions;

        let graph = graph::TransactionGraph::build(clean);
        tracing::debug!(nodes = graph.node_count(), "graph built");

        let smurfing::SmurfingResult {
            merchant_whitelist,
            smurf_map,
        } = smurfing::detect(clean, &self.config);
        tracing::debug!(
            whitelisted = merchant_whitelist.len(),
            flagged = smurf_map.len(),
            "smurfing pass complete"
        );

        let cycle_data = cycles::detect(&graph, &merchant_whitelist, &self.config);
        tracing::debug!(rings = cycle_data.rings.len(), "cycle pass complete");

        let shell_map = shells::detect(
            &graph,
            clean,
            &merchant_whitelist,
            &cycle_data.cycle_members,
            &self.config,
        );
        tracing::debug!(flagged = shell_map.len(), "shell pass complete");

        let mastermind_data = mastermind::detect(&graph, &cycle_data.rings);
        tracing::debug!(identified = mastermind_data.len(), "mastermind pass complete");

        let assembled = rings::assemble(
            clean,
            &graph,
            &self.config,
            cycle_data,
            smurf_map,
            shell_map,
            mastermind_data,
            &merchant_whitelist,
        );

        let elapsed = started.elapsed().as_secs_f64();
        tracing::info!(
            rings = assembled.fraud_rings.len(),
            suspects = assembled.suspects.len(),
            false_positives = assembled.false_positives,
            elapsed,
            "analysis complete"
        );

        AnalysisResult {
            analysis_id,
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            summary: Summary {
                total_accounts_analyzed: graph.node_count(),
                suspicious_accounts_flagged: assembled.suspects.len(),
                fraud_rings_detected: assembled.fraud_rings.len(),
                mastermind_accounts_identified: assembled
                    .suspects
                    .iter()
                    .filter(|s| s.is_mastermind)
                    .count(),
                processing_time_seconds: (elapsed * 1000.0).round() / 1000.0,
                false_positives_filtered: assembled.false_positives,
            },
            suspicious_accounts: assembled.suspects,
            fraud_rings: assembled.fraud_rings,
        }
    }
}
