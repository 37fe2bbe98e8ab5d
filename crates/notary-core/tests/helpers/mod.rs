#![allow(dead_code)]

use notary_core::{BlockHasher, Ledger, LedgerConfig, Sha256Hasher};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub const TEST_DIFFICULTY: u32 = 2;

pub fn test_ledger() -> Ledger {
    Ledger::with_config(LedgerConfig::default().with_difficulty(TEST_DIFFICULTY))
        .expect("Failed to build ledger")
}

/// A record shaped like what the dashboards notarize.
pub fn random_record() -> Value {
    let mut rng = rand::thread_rng();
    let id: u32 = rng.gen_range(1000..9999);
    match rng.gen_range(0..3) {
        0 => json!({
            "studentId": format!("STU{id}"),
            "degree": "Bachelor of Technology",
            "gpa": rng.gen_range(20..40) as f64 / 10.0,
        }),
        1 => json!({
            "certId": format!("cert_{id}"),
            "studentId": format!("STU{id}"),
            "credits": rng.gen_range(1..6),
        }),
        _ => json!({
            "event": "verification",
            "employer": "Acme Corp",
            "records": [format!("cert_{id}"), format!("rec_{id}")],
        }),
    }
}

pub fn ledger_with_records(n: usize) -> Ledger {
    let mut ledger = test_ledger();
    for _ in 0..n {
        ledger.append(&random_record()).expect("Failed to append");
    }
    ledger
}

/// SHA-256 that can be switched to never meet any difficulty, keeping a
/// mining search busy until it is cancelled.
#[derive(Default)]
pub struct Gate {
    closed: AtomicBool,
    attempts: AtomicU64,
}

impl Gate {
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl BlockHasher for Gate {
    fn digest(&self, bytes: &[u8]) -> String {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            "f".repeat(Sha256Hasher.digest_width())
        } else {
            Sha256Hasher.digest(bytes)
        }
    }

    fn digest_width(&self) -> usize {
        Sha256Hasher.digest_width()
    }
}
