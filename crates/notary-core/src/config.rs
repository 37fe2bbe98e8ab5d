use crate::constants::{GENESIS_PAYLOAD, POW_TARGET_DIFFICULTY};
use crate::hash::BlockHasher;
use crate::mine::mine_block_parallel;
use crate::pow::{mine_block, CancelToken};
use crate::Block;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningMode {
    /// Single thread, nonces tried in order from 0.
    #[default]
    Sequential,
    /// Nonce space split across the rayon pool.
    Parallel,
}

impl MiningMode {
    pub fn mine<H: BlockHasher + ?Sized>(
        self,
        block: Block,
        difficulty: u32,
        hasher: &H,
        cancel: &CancelToken,
    ) -> Option<Block> {
        match self {
            MiningMode::Sequential => mine_block(block, difficulty, hasher, cancel),
            MiningMode::Parallel => mine_block_parallel(block, difficulty, hasher, cancel),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Leading zero hex digits every block hash must have. Fixed for the
    /// lifetime of a ledger.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default)]
    pub mining: MiningMode,
    #[serde(default = "default_genesis_payload")]
    pub genesis_payload: String,
}

fn default_difficulty() -> u32 {
    POW_TARGET_DIFFICULTY
}

fn default_genesis_payload() -> String {
    GENESIS_PAYLOAD.to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining: MiningMode::default(),
            genesis_payload: default_genesis_payload(),
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_mining(mut self, mining: MiningMode) -> Self {
        self.mining = mining;
        self
    }
}
