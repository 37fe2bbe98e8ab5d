use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::error::Result;
use crate::hash::BlockHasher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the Unix epoch when the candidate was built.
    pub timestamp: u64,
    pub payload: Value,
    pub previous_hash: String,
    /// Empty until the block has been mined.
    pub hash: String,
    pub nonce: u64,
}

impl Block {
    /// An unsealed block extending `previous`.
    pub fn candidate(previous: &Block, payload: Value, now: u64) -> Self {
        Self {
            index: previous.index + 1,
            timestamp: now,
            payload,
            previous_hash: previous.hash.clone(),
            hash: String::new(),
            nonce: 0,
        }
    }

    /// An unsealed genesis block carrying `marker` as its payload.
    pub fn genesis(marker: &str, now: u64) -> Self {
        Self {
            index: 0,
            timestamp: now,
            payload: Value::String(marker.to_string()),
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            hash: String::new(),
            nonce: 0,
        }
    }

    pub fn is_sealed(&self) -> bool {
        !self.hash.is_empty()
    }

    /// Bytes fed to the hasher. The stored `hash` is not part of them.
    pub fn hash_bytes(&self) -> Vec<u8> {
        let payload = canonical_json(&self.payload);
        let mut bytes =
            Vec::with_capacity(8 + 8 + self.previous_hash.len() + 8 + 8 + payload.len() + 8);
        bytes.extend_from_slice(&self.index.to_le_bytes());
        put_str(&mut bytes, &self.previous_hash);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        put_str(&mut bytes, &payload);
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn compute_hash<H: BlockHasher + ?Sized>(&self, hasher: &H) -> String {
        hasher.digest(&self.hash_bytes())
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Converts any serializable payload into the untyped form stored in blocks.
pub fn to_payload<P: Serialize + ?Sized>(payload: &P) -> Result<Value> {
    Ok(serde_json::to_value(payload)?)
}

/// Compact JSON with object keys sorted at every depth, so equal content
/// always produces equal bytes regardless of how the map was built.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Serializing a str cannot fail.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
