use thiserror::Error;

/// Why a sequence of blocks failed validation. Indices refer to positions in
/// the validated slice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("chain has no blocks")]
    Empty,

    #[error("genesis block has index {0}, expected 0")]
    GenesisIndex(u64),

    #[error("genesis block previous hash is {0:?}, expected the sentinel")]
    GenesisPreviousHash(String),

    #[error("block {index}: stored hash {stored} does not match recomputed {computed}")]
    HashMismatch {
        index: usize,
        stored: String,
        computed: String,
    },

    #[error("block {index}: previous hash does not match its predecessor's hash")]
    BrokenLink { index: usize },

    #[error("block {index}: index {found} does not follow {previous}")]
    IndexGap {
        index: usize,
        previous: u64,
        found: u64,
    },

    #[error("block {index}: hash does not meet difficulty {difficulty}")]
    InsufficientWork { index: usize, difficulty: u32 },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("chain is empty")]
    EmptyChain,

    #[error("payload cannot be canonicalized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("mining was cancelled")]
    Cancelled,

    #[error("difficulty {difficulty} exceeds maximum {max} for this digest")]
    InvalidDifficulty { difficulty: u32, max: usize },

    #[error("candidate for index {found} is stale, next index is {expected}")]
    StaleCandidate { expected: u64, found: u64 },

    #[error("invalid block: {0}")]
    InvalidBlock(#[from] ChainFault),

    #[error("ledger service is closed")]
    ServiceClosed,

    #[error("mining task failed: {0}")]
    MinerFailed(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
