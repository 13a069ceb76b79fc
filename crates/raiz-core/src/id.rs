//! Identity types for RAIZ
//!
//! Node identifiers are configured strings (`node-001`). TRON identifiers are
//! minted at birth and are unique for the lifetime of the process.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize, Serializer};

use crate::SimTime;

/// Node identity - configured, unique within a running system
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide birth counter. Never reset, so ids stay unique across
/// system resets.
static NEXT_TRON_SEQ: AtomicU64 = AtomicU64::new(1);

/// TRON identity
///
/// Format: `tron_<birth-ms>_<seq>`. The sequence number alone is unique per
/// process; the birth time is kept for readability in logs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TronId {
    born_ms: u64,
    seq: u64,
}

impl TronId {
    /// Mint a fresh identity for a TRON born at `born`
    pub fn generate(born: SimTime) -> Self {
        TronId {
            born_ms: born.as_millis(),
            seq: NEXT_TRON_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    #[inline]
    pub fn born_ms(self) -> u64 {
        self.born_ms
    }

    #[inline]
    pub fn seq(self) -> u64 {
        self.seq
    }
}

impl fmt::Debug for TronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tron({}:{})", self.born_ms, self.seq)
    }
}

impl fmt::Display for TronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tron_{}_{:06}", self.born_ms, self.seq)
    }
}

impl Serialize for TronId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
