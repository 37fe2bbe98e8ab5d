use crate::block::{now_millis, to_payload};
use crate::config::LedgerConfig;
use crate::error::{ChainFault, LedgerError, Result};
use crate::hash::{BlockHasher, Sha256Hasher};
use crate::mine::Miner;
use crate::pow::CancelToken;
use crate::validate::ChainValidator;
use crate::Block;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Append-only sequence of sealed blocks. The ledger is the only writer;
/// every read hands out clones.
pub struct Ledger<H: BlockHasher = Sha256Hasher> {
    blocks: Vec<Block>,
    hasher: Arc<H>,
    config: LedgerConfig,
}

impl Ledger<Sha256Hasher> {
    /// A SHA-256 ledger at the default difficulty, genesis already mined.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
            .expect("default difficulty fits the digest and genesis mining is never cancelled")
    }

    pub fn with_config(config: LedgerConfig) -> Result<Self> {
        Self::with_hasher(config, Sha256Hasher)
    }
}

impl Default for Ledger<Sha256Hasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: BlockHasher> Ledger<H> {
    pub fn with_hasher(config: LedgerConfig, hasher: H) -> Result<Self> {
        // Only an all-zero digest meets a full-width target.
        let max = hasher.digest_width().saturating_sub(1);
        if config.difficulty as usize > max {
            return Err(LedgerError::InvalidDifficulty {
                difficulty: config.difficulty,
                max,
            });
        }
        let genesis = Self::seal_genesis(&config, &hasher, &CancelToken::new())
            .ok_or(LedgerError::Cancelled)?;
        Ok(Self {
            blocks: vec![genesis],
            hasher: Arc::new(hasher),
            config,
        })
    }

    fn seal_genesis(config: &LedgerConfig, hasher: &H, cancel: &CancelToken) -> Option<Block> {
        let genesis = Block::genesis(&config.genesis_payload, now_millis());
        let sealed = config
            .mining
            .mine(genesis, config.difficulty, hasher, cancel)?;
        debug!("genesis block sealed with hash {}", sealed.hash);
        Some(sealed)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn hasher(&self) -> &Arc<H> {
        &self.hasher
    }

    /// Mine `payload` into a new block on top of the head and store it.
    pub fn append<P: Serialize + ?Sized>(&mut self, payload: &P) -> Result<Block> {
        self.append_with_cancel(payload, &CancelToken::new())
    }

    /// Like [`Ledger::append`], but gives up with [`LedgerError::Cancelled`]
    /// once `cancel` fires. A cancelled append leaves the chain untouched.
    pub fn append_with_cancel<P: Serialize + ?Sized>(
        &mut self,
        payload: &P,
        cancel: &CancelToken,
    ) -> Result<Block> {
        let candidate = self.prepare(payload)?;
        let sealed = self.mine(candidate, cancel)?;
        self.commit(sealed)
    }

    /// Unsealed candidate referencing the current head. Nothing is stored.
    pub fn prepare<P: Serialize + ?Sized>(&self, payload: &P) -> Result<Block> {
        let payload = to_payload(payload)?;
        let head = self.blocks.last().ok_or(LedgerError::EmptyChain)?;
        Ok(Block::candidate(head, payload, now_millis()))
    }

    /// Run this ledger's miner over `candidate` without touching the chain.
    pub fn mine(&self, candidate: Block, cancel: &CancelToken) -> Result<Block> {
        self.miner().seal(candidate, cancel)
    }

    /// Detached miner sharing this ledger's hasher and difficulty.
    pub fn miner(&self) -> Miner<H> {
        Miner::new(
            self.config.mining,
            self.config.difficulty,
            Arc::clone(&self.hasher),
        )
    }

    /// Store a sealed block if it still extends the head. Blocks built on an
    /// older head, or failing the hash/work checks, are rejected.
    pub fn commit(&mut self, sealed: Block) -> Result<Block> {
        let head = self.blocks.last().ok_or(LedgerError::EmptyChain)?;
        let expected = head.index + 1;
        if sealed.index != expected || sealed.previous_hash != head.hash {
            warn!(
                "discarding stale block {} (head is {})",
                sealed.index, head.index
            );
            return Err(LedgerError::StaleCandidate {
                expected,
                found: sealed.index,
            });
        }
        self.validator()
            .check_block(self.blocks.len(), &sealed)
            .inspect_err(|fault| warn!("rejecting block {}: {fault}", sealed.index))?;

        debug!("committed block {} with hash {}", sealed.index, sealed.hash);
        self.blocks.push(sealed.clone());
        Ok(sealed)
    }

    pub fn head(&self) -> Result<Block> {
        self.blocks.last().cloned().ok_or(LedgerError::EmptyChain)
    }

    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    /// Read-only view of the stored blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true for a constructed ledger; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_at(&self, index: u64) -> Option<Block> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.blocks.get(i))
            .cloned()
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<Block> {
        self.blocks.iter().find(|b| b.hash == hash).cloned()
    }

    /// Whether `hash` identifies a block on this chain.
    pub fn verify_record(&self, hash: &str) -> bool {
        self.blocks.iter().any(|b| b.hash == hash)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> std::result::Result<(), ChainFault> {
        self.validator().validate(&self.blocks)
    }

    /// Validator configured with this ledger's hasher and difficulty.
    pub fn validator(&self) -> ChainValidator<'_, H> {
        ChainValidator::new(&*self.hasher).with_difficulty(self.config.difficulty)
    }
}
