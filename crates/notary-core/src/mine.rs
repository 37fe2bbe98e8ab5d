use crate::config::MiningMode;
use crate::error::{LedgerError, Result};
use crate::hash::BlockHasher;
use crate::pow::{meets_difficulty, CancelToken};
use crate::Block;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything needed to seal a candidate, detached from the ledger so the
/// search can run on another thread while the chain stays readable.
pub struct Miner<H: BlockHasher> {
    mode: MiningMode,
    difficulty: u32,
    hasher: Arc<H>,
}

impl<H: BlockHasher> Clone for Miner<H> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            difficulty: self.difficulty,
            hasher: Arc::clone(&self.hasher),
        }
    }
}

impl<H: BlockHasher> Miner<H> {
    pub fn new(mode: MiningMode, difficulty: u32, hasher: Arc<H>) -> Self {
        Self {
            mode,
            difficulty,
            hasher,
        }
    }

    pub fn seal(&self, candidate: Block, cancel: &CancelToken) -> Result<Block> {
        let index = candidate.index;
        self.mode
            .mine(candidate, self.difficulty, &*self.hasher, cancel)
            .ok_or_else(|| {
                warn!("mining of block {index} cancelled");
                LedgerError::Cancelled
            })
    }
}

/// Mines a block by searching nonces in parallel until its hash starts with
/// `difficulty` zero hex digits. Any satisfying nonce may win, so the result
/// is not necessarily the smallest one. Returns `None` if `cancel` fires first.
pub fn mine_block_parallel<H: BlockHasher + ?Sized>(
    block: Block,
    difficulty: u32,
    hasher: &H,
    cancel: &CancelToken,
) -> Option<Block> {
    // Only the nonce varies between attempts.
    let base = block;

    // Rayon splits the range across threads. A cancelled token makes every
    // worker report a hit so the search unwinds quickly.
    let found = (0u64..u64::MAX).into_par_iter().find_any(|nonce| {
        if cancel.is_cancelled() {
            return true;
        }
        let mut attempt = base.clone();
        attempt.nonce = *nonce;
        meets_difficulty(&attempt.compute_hash(hasher), difficulty)
    })?;

    if cancel.is_cancelled() {
        return None;
    }

    let mut sealed = base;
    sealed.nonce = found;
    sealed.hash = sealed.compute_hash(hasher);

    info!(
        "Mined block {} with nonce {} and hash {}",
        sealed.index, sealed.nonce, sealed.hash
    );
    Some(sealed)
}
