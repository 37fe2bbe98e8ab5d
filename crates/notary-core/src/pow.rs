use crate::constants::CANCEL_POLL_INTERVAL;
use crate::hash::BlockHasher;
use crate::{Block, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared flag used to abandon a nonce search. Clones observe the same flag;
/// a derived token is also cancelled when any of its parents is.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<CancelInner>);

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    parents: Vec<CancelToken>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Self::derived(vec![self.clone()])
    }

    /// A token that fires when either `self` or `other` does. Cancelling it
    /// directly affects neither.
    pub fn joined(&self, other: &CancelToken) -> Self {
        Self::derived(vec![self.clone(), other.clone()])
    }

    fn derived(parents: Vec<CancelToken>) -> Self {
        Self(Arc::new(CancelInner {
            cancelled: AtomicBool::new(false),
            parents,
        }))
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Relaxed)
            || self.0.parents.iter().any(|p| p.is_cancelled())
    }
}

/// True when the first `difficulty` characters of `hash` are all `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let d = difficulty as usize;
    hash.len() >= d && hash.bytes().take(d).all(|c| c == b'0')
}

pub fn leading_zero_hex_digits(hash: &str) -> usize {
    hash.bytes().take_while(|c| *c == b'0').count()
}

/// Leading zero bits of a raw digest, e.g. from [`Sha256Hasher::digest_bytes`].
///
/// [`Sha256Hasher::digest_bytes`]: crate::hash::Sha256Hasher::digest_bytes
pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

/// Mine the block by incrementing the nonce from 0 until its hash starts with
/// `difficulty` zero hex digits. Returns `None` if `cancel` fires first.
pub fn mine_block<H: BlockHasher + ?Sized>(
    mut block: Block,
    difficulty: u32,
    hasher: &H,
    cancel: &CancelToken,
) -> Option<Block> {
    block.nonce = 0;
    loop {
        if block.nonce % CANCEL_POLL_INTERVAL == 0 && cancel.is_cancelled() {
            return None;
        }
        let hash = block.compute_hash(hasher);
        if meets_difficulty(&hash, difficulty) {
            block.hash = hash;
            info!(
                "Mined block {} with nonce {} and hash {}",
                block.index, block.nonce, block.hash
            );
            return Some(block);
        }
        block.nonce = block.nonce.wrapping_add(1);
    }
}
