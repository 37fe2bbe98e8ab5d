pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const POW_TARGET_DIFFICULTY: u32 = 4;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_PAYLOAD: &str = "Genesis Block - notary ledger initialized";
/// How many nonces the sequential miner tries between cancellation checks.
pub const CANCEL_POLL_INTERVAL: u64 = 1 << 12;
