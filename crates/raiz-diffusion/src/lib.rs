//! RAIZ Diffusion - How TRONs leave a node
//!
//! The gateway fans a TRON out over a fixed set of simulated transport
//! channels and keeps per-channel message counters. No bytes move: each
//! propagation is a bookkeeping event.

pub mod channel;
pub mod gateway;

pub use channel::*;
pub use gateway::*;
