//! Full-chain integrity checks.

use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::error::ChainFault;
use crate::hash::BlockHasher;
use crate::pow::meets_difficulty;
use crate::Block;

/// Re-derives every block hash and checks the links between neighbours.
///
/// Without a difficulty only hashes, links and indices are checked; with one,
/// every hash must also carry the proof-of-work prefix.
pub struct ChainValidator<'h, H: BlockHasher + ?Sized> {
    hasher: &'h H,
    difficulty: Option<u32>,
}

impl<'h, H: BlockHasher + ?Sized> ChainValidator<'h, H> {
    pub fn new(hasher: &'h H) -> Self {
        Self {
            hasher,
            difficulty: None,
        }
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn is_valid(&self, chain: &[Block]) -> bool {
        self.validate(chain).is_ok()
    }

    /// Stops at the first fault found.
    pub fn validate(&self, chain: &[Block]) -> Result<(), ChainFault> {
        let genesis = chain.first().ok_or(ChainFault::Empty)?;
        if genesis.index != 0 {
            return Err(ChainFault::GenesisIndex(genesis.index));
        }
        if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
            return Err(ChainFault::GenesisPreviousHash(
                genesis.previous_hash.clone(),
            ));
        }
        self.check_block(0, genesis)?;

        for (i, pair) in chain.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let position = i + 1;
            self.check_block(position, current)?;
            if current.previous_hash != previous.hash {
                return Err(ChainFault::BrokenLink { index: position });
            }
            if previous.index.checked_add(1) != Some(current.index) {
                return Err(ChainFault::IndexGap {
                    index: position,
                    previous: previous.index,
                    found: current.index,
                });
            }
        }
        Ok(())
    }

    /// Checks a single block in isolation: its stored hash and, if a
    /// difficulty is set, its proof of work.
    pub fn check_block(&self, position: usize, block: &Block) -> Result<(), ChainFault> {
        let computed = block.compute_hash(self.hasher);
        if computed != block.hash {
            return Err(ChainFault::HashMismatch {
                index: position,
                stored: block.hash.clone(),
                computed,
            });
        }
        if let Some(difficulty) = self.difficulty {
            if !meets_difficulty(&block.hash, difficulty) {
                return Err(ChainFault::InsufficientWork {
                    index: position,
                    difficulty,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Hasher;
    use crate::pow::{mine_block, CancelToken};
    use serde_json::json;

    const D: u32 = 2;

    fn build_chain(len: usize) -> Vec<Block> {
        let cancel = CancelToken::new();
        let genesis = mine_block(Block::genesis("g", 1_000), D, &Sha256Hasher, &cancel).unwrap();
        let mut chain = vec![genesis];
        for i in 1..len {
            let c = Block::candidate(chain.last().unwrap(), json!({ "n": i }), 1_000 + i as u64);
            chain.push(mine_block(c, D, &Sha256Hasher, &cancel).unwrap());
        }
        chain
    }

    fn validator() -> ChainValidator<'static, Sha256Hasher> {
        ChainValidator::new(&Sha256Hasher).with_difficulty(D)
    }

    #[test]
    fn mined_chain_is_valid() {
        let chain = build_chain(4);
        assert_eq!(validator().validate(&chain), Ok(()));
        assert!(ChainValidator::new(&Sha256Hasher).is_valid(&chain));
    }

    #[test]
    fn empty_chain_is_invalid() {
        assert_eq!(validator().validate(&[]), Err(ChainFault::Empty));
    }

    #[test]
    fn tampered_payload_detected() {
        let mut chain = build_chain(3);
        chain[1].payload = json!({ "n": 999 });
        assert!(matches!(
            validator().validate(&chain),
            Err(ChainFault::HashMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn tampered_hash_detected() {
        let mut chain = build_chain(3);
        chain[2].hash = "00ffee".into();
        assert!(!validator().is_valid(&chain));
    }

    #[test]
    fn tampered_previous_hash_detected() {
        let mut chain = build_chain(3);
        chain[2].previous_hash = chain[0].hash.clone();
        assert!(!validator().is_valid(&chain));
    }

    #[test]
    fn resealed_tampering_still_breaks_link() {
        let mut chain = build_chain(3);
        chain[1].payload = json!("forged");
        let resealed = mine_block(chain[1].clone(), D, &Sha256Hasher, &CancelToken::new()).unwrap();
        chain[1] = resealed;
        assert_eq!(
            validator().validate(&chain),
            Err(ChainFault::BrokenLink { index: 2 })
        );
    }

    #[test]
    fn genesis_sentinel_enforced() {
        let mut chain = build_chain(1);
        chain[0].previous_hash = "abc".into();
        assert_eq!(
            validator().validate(&chain),
            Err(ChainFault::GenesisPreviousHash("abc".into()))
        );
    }

    #[test]
    fn index_gap_detected() {
        let cancel = CancelToken::new();
        let chain = build_chain(2);
        let mut skipped = Block::candidate(&chain[1], json!(null), 5_000);
        skipped.index += 1;
        let skipped = mine_block(skipped, D, &Sha256Hasher, &cancel).unwrap();
        let mut chain = chain;
        chain.push(skipped);
        assert_eq!(
            validator().validate(&chain),
            Err(ChainFault::IndexGap {
                index: 2,
                previous: 1,
                found: 3
            })
        );
    }

    #[test]
    fn insufficient_work_detected_only_with_difficulty() {
        let mut genesis = Block::genesis("g", 1);
        // Find a nonce whose hash has no leading zero.
        while genesis.compute_hash(&Sha256Hasher).starts_with('0') {
            genesis.nonce += 1;
        }
        genesis.hash = genesis.compute_hash(&Sha256Hasher);
        let chain = vec![genesis];
        assert!(ChainValidator::new(&Sha256Hasher).is_valid(&chain));
        assert_eq!(
            validator().validate(&chain),
            Err(ChainFault::InsufficientWork {
                index: 0,
                difficulty: D
            })
        );
    }
}
