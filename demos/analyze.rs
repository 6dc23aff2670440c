//! Reads a transaction CSV from a path given on the command line (or
//! from stdin if omitted) and prints the analysis result as JSON.

use std::io::Read;

use mule_ring_detector::MoneyMuleDetector;

fn main() {
    tracing_subscriber::fmt::init();

    let mut bytes = Vec::new();
    match std::env::args().nth(1) {
        Some(path) => {
            bytes = std::fs::read(&path).unwrap_or_else(|e| {
                eprintln!("failed to read {path}: {e}");
                std::process::exit(1);
            });
        }
        None => {
            std::io::stdin().read_to_end(&mut bytes).unwrap_or_else(|e| {
                eprintln!("failed to read stdin: {e}");
                std::process::exit(1);
            });
        }
    }

    let transactions = MoneyMuleDetector::parse(&bytes).unwrap_or_else(|e| {
        eprintln!("invalid input: {e}");
        std::process::exit(1);
    });

    let detector = MoneyMuleDetector::new();
    let result = detector.run(&transactions);

    match result.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("failed to serialize result: {e}");
            std::process::exit(1);
        }
    }
}
