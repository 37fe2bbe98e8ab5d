mod helpers;

use helpers::{ledger_with_records, random_record, test_ledger, TEST_DIFFICULTY};
use notary_core::constants::GENESIS_PREVIOUS_HASH;
use notary_core::{
    meets_difficulty, Block, ChainFault, ChainValidator, Ledger, LedgerConfig, MiningMode,
    Sha256Hasher,
};
use serde_json::json;

#[test]
fn appended_chain_is_valid_and_linked() {
    let ledger = ledger_with_records(10);
    let chain = ledger.snapshot();
    assert_eq!(chain.len(), 11);
    assert!(ledger.is_valid());

    assert_eq!(chain[0].index, 0);
    assert_eq!(chain[0].previous_hash, GENESIS_PREVIOUS_HASH);
    for pair in chain.windows(2) {
        assert_eq!(pair[1].previous_hash, pair[0].hash);
        assert_eq!(pair[1].index, pair[0].index + 1);
    }
    for block in &chain {
        assert!(meets_difficulty(&block.hash, TEST_DIFFICULTY));
        assert_eq!(block.hash, block.compute_hash(&Sha256Hasher));
    }
}

#[test]
fn every_single_field_tamper_is_detected() {
    let ledger = ledger_with_records(4);
    let validator = ledger.validator();
    let original = ledger.snapshot();

    for i in 0..original.len() {
        let mut chain = original.clone();
        chain[i].payload = json!({"forged": true});
        assert!(!validator.is_valid(&chain), "payload tamper at {i}");

        let mut chain = original.clone();
        chain[i].hash = "0".repeat(64);
        assert!(!validator.is_valid(&chain), "hash tamper at {i}");

        let mut chain = original.clone();
        chain[i].previous_hash = "1234".into();
        assert!(!validator.is_valid(&chain), "previous hash tamper at {i}");
    }
    assert!(ledger.is_valid());
}

#[test]
fn corrupted_copy_fails_while_live_ledger_stays_valid() {
    let ledger = ledger_with_records(2);
    let mut copy = ledger.snapshot();
    copy[1].hash = "not-a-real-hash".into();

    assert!(matches!(
        ledger.validator().validate(&copy),
        Err(ChainFault::HashMismatch { index: 1, .. })
    ));
    assert!(ledger.is_valid());
    assert_ne!(ledger.snapshot()[1].hash, copy[1].hash);
}

#[test]
fn genesis_invariant_holds_for_fresh_ledgers() {
    for _ in 0..3 {
        let ledger = test_ledger();
        let snap = ledger.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].index, 0);
        assert_eq!(snap[0].previous_hash, GENESIS_PREVIOUS_HASH);
    }
}

#[test]
fn find_by_hash_resolves_each_block() {
    let ledger = ledger_with_records(5);
    for block in ledger.snapshot() {
        assert_eq!(ledger.find_by_hash(&block.hash), Some(block.clone()));
        assert!(ledger.verify_record(&block.hash));
    }
    assert_eq!(ledger.find_by_hash(""), None);
}

#[test]
fn reads_do_not_change_without_appends() {
    let mut ledger = ledger_with_records(3);
    let first = ledger.snapshot();
    let head = ledger.head().unwrap();
    assert_eq!(first, ledger.snapshot());
    assert_eq!(ledger.find_by_hash(&head.hash), ledger.find_by_hash(&head.hash));

    ledger.append(&random_record()).unwrap();
    assert_eq!(ledger.snapshot().len(), first.len() + 1);
    assert_eq!(&ledger.snapshot()[..first.len()], &first[..]);
}

#[test]
fn parallel_mining_builds_valid_chain() {
    let config = LedgerConfig::default()
        .with_difficulty(3)
        .with_mining(MiningMode::Parallel);
    let mut ledger = Ledger::with_config(config).unwrap();
    for _ in 0..3 {
        let block = ledger.append(&random_record()).unwrap();
        assert!(block.hash.starts_with("000"));
    }
    assert!(ledger.is_valid());
}

#[test]
fn chain_from_one_ledger_checks_against_standalone_validator() {
    let ledger = ledger_with_records(3);
    let blocks: Vec<Block> = ledger.snapshot();
    assert!(ChainValidator::new(&Sha256Hasher).is_valid(&blocks));
    // A stricter target than the one the blocks were mined at.
    assert!(!ChainValidator::new(&Sha256Hasher)
        .with_difficulty(20)
        .is_valid(&blocks));
}
