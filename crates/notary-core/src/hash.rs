//! Digest functions used to seal blocks.
//!
//! Everything that hashes a block goes through [`BlockHasher`], so the digest
//! can be swapped without touching the miner, the ledger or the validator.

use crate::constants::HASH_HEX_SIZE;
use crate::Hash;
use sha2::{Digest, Sha256};

pub trait BlockHasher: Send + Sync {
    /// Digest `bytes` into a fixed-width lowercase hex string.
    fn digest(&self, bytes: &[u8]) -> String;

    /// Number of hex characters every digest has. Bounds the usable difficulty.
    fn digest_width(&self) -> usize;
}

/// SHA-256, rendered as 64 lowercase hex characters.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    pub fn digest_bytes(bytes: &[u8]) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..]);
        out
    }
}

impl BlockHasher for Sha256Hasher {
    fn digest(&self, bytes: &[u8]) -> String {
        hex::encode(Self::digest_bytes(bytes))
    }

    fn digest_width(&self) -> usize {
        HASH_HEX_SIZE
    }
}

impl<H: BlockHasher + ?Sized> BlockHasher for std::sync::Arc<H> {
    fn digest(&self, bytes: &[u8]) -> String {
        (**self).digest(bytes)
    }

    fn digest_width(&self) -> usize {
        (**self).digest_width()
    }
}
