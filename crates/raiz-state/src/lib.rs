//! RAIZ State - Distributed memory nodes
//!
//! Each node privately owns a collection of TRONs and runs its own
//! lifecycle sweep:
//! - expiry / delivery detection (ALIVE → DYING)
//! - apoptosis completion after the grace interval (DYING → DEAD)
//! - removal of dead TRONs in the same sweep
//!
//! Replication here is bookkeeping only: the origin TRON records which peers
//! it was replicated to. No node ever touches another node's collection.

pub mod memory;

pub use memory::*;
