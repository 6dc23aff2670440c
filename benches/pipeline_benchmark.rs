use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mule_ring_detector::{MoneyMuleDetector, Transaction};

fn synthetic_batch(rows: usize) -> Vec<Transaction> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut out = Vec::with_capacity(rows);

    // A planted cycle ring, a planted fan-in hub and a planted shell
    // chain, then filler traffic between ordinary accounts.
    for i in 0..3 {
        let a = format!("CYC3_{}", i);
        let b = format!("CYC3_{}", (i + 1) % 3);
        out.push(Transaction {
            transaction_id: format!("cyc-{i}"),
            sender_id: a,
            receiver_id: b,
            amount: 12_000.0,
            timestamp: base,
        });
    }
    for i in 0..15 {
        out.push(Transaction {
            transaction_id: format!("smurf-{i}"),
            sender_id: format!("S{i}"),
            receiver_id: "SMURF_HUB".to_string(),
            amount: 500.0,
            timestamp: base + Duration::hours(i as i64),
        });
    }
    for i in 0..4 {
        out.push(Transaction {
            transaction_id: format!("shell-{i}"),
            sender_id: format!("SH_INT{i}"),
            receiver_id: format!("SH_INT{}", i + 1),
            amount: 900.0,
            timestamp: base,
        });
    }

    let mut i = 0usize;
    while out.len() < rows {
        out.push(Transaction {
            transaction_id: format!("filler-{i}"),
            sender_id: format!("ACCT{}", i % 500),
            receiver_id: format!("ACCT{}", (i + 1) % 500),
            amount: 25.0 + (i % 100) as f64,
            timestamp: base + Duration::minutes(i as i64),
        });
        i += 1;
    }
    out
}

fn pipeline_benchmark(c: &mut Criterion) {
    let batch = synthetic_batch(10_000);
    let detector = MoneyMuleDetector::new();

    c.bench_function("run_10k_transactions", |b| {
        b.iter(|| black_box(detector.run(black_box(&batch))))
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
