//! Append-only, proof-of-work sealed hash chain for notarizing arbitrary
//! records in process.

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod mine;
pub mod pow;
pub mod service;
pub mod validate;

pub use block::{canonical_json, Block};
pub use chain::Ledger;
pub use config::{LedgerConfig, MiningMode};
pub use error::{ChainFault, LedgerError, Result};
pub use hash::{BlockHasher, Sha256Hasher};
pub use pow::{meets_difficulty, CancelToken};
pub use service::{LedgerHandle, LedgerService};
pub use validate::ChainValidator;

pub type Hash = [u8; 32];
