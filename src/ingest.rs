//! CSV ingestion: parse raw bytes into cleaned `Transaction` rows.
//!
//! Row-level failures (unparseable amount, unparseable timestamp,
//! self-transfers) are dropped silently; there is no caller-visible
//! signal for them beyond a debug log line. A batch that is empty
//! after cleaning is not an error — it produces a well-formed, empty
//! result further down the pipeline.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::PipelineError;
use crate::Transaction;

const REQUIRED_COLUMNS: &[&str] = &["transaction_id", "sender_id", "receiver_id", "amount", "timestamp"];

/// Parses a CSV byte buffer into cleaned transactions.
///
/// Returns `PipelineError::InvalidInput` only when the header is
/// missing a required column; every other malformed row is dropped.
/// Column matching is case- and whitespace-insensitive, matching how
/// the source data is actually exported by upstream systems.
pub fn parse(csv_bytes: &[u8]) -> Result<Vec<Transaction>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_bytes);

    let headers = reader
        .headers()
        .map_err(|_| PipelineError::InvalidInput {
            missing_columns: REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        })?
        .clone();
    let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let mut columns = std::collections::HashMap::new();
    for name in REQUIRED_COLUMNS {
        if let Some(pos) = lower.iter().position(|h| h == name) {
            columns.insert(*name, pos);
        }
    }
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !columns.contains_key(*c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::InvalidInput {
            missing_columns: missing,
        });
    }

    let mut out = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let Ok(record) = record else {
            dropped += 1;
            continue;
        };
        let get = |col: &str| record.get(columns[col]).unwrap_or("").trim();

        if get("sender_id") == get("receiver_id") {
            dropped += 1;
            continue;
        }
        let Ok(amount) = get("amount").parse::<f64>() else {
            dropped += 1;
            continue;
        };
        if !amount.is_finite() {
            dropped += 1;
            continue;
        }
        let Some(timestamp) = parse_day_first(get("timestamp")) else {
            dropped += 1;
            continue;
        };
        out.push(Transaction {
            transaction_id: get("transaction_id").to_string(),
            sender_id: get("sender_id").to_string(),
            receiver_id: get("receiver_id").to_string(),
            amount,
            timestamp,
        });
    }
    if dropped > 0 {
        tracing::debug!(dropped, "rows dropped during ingestion");
    }
    Ok(out)
}

/// Parses a timestamp the way the original CSV fixtures are produced:
/// day-first, assumed UTC if no offset is given.
fn parse_day_first(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: &[&str] = &[
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d-%m-%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_rows() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                    t1,A,B,100.0,01/03/2024 10:00:00\n";
        let txs = parse(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].sender_id, "A");
        assert_eq!(txs[0].amount, 100.0);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let csv = "transaction_id,sender_id,amount,timestamp\nt1,A,100.0,01/03/2024 10:00:00\n";
        let err = parse(csv.as_bytes()).unwrap_err();
        match err {
            PipelineError::InvalidInput { missing_columns } => {
                assert!(missing_columns.contains(&"receiver_id".to_string()));
            }
        }
    }

    #[test]
    fn rows_with_bad_amount_are_dropped_silently() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                    t1,A,B,not_a_number,01/03/2024 10:00:00\n\
                    t2,A,B,50.0,01/03/2024 11:00:00\n";
        let txs = parse(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].transaction_id, "t2");
    }

    #[test]
    fn empty_after_cleaning_is_not_an_error() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                    t1,A,B,bad,01/03/2024 10:00:00\n";
        let txs = parse(csv.as_bytes()).unwrap();
        assert!(txs.is_empty());
    }

    #[test]
    fn self_transfers_are_dropped() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                    t1,A,A,100.0,01/03/2024 10:00:00\n\
                    t2,A,B,50.0,01/03/2024 11:00:00\n";
        let txs = parse(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].transaction_id, "t2");
    }

    #[test]
    fn header_case_and_whitespace_are_normalized() {
        let csv = " Transaction_Id , Sender_Id , Receiver_Id , Amount , Timestamp \n\
                    t1,A,B,10.0,01/03/2024 10:00:00\n";
        let txs = parse(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
    }
}
