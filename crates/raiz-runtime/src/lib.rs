//! RAIZ Runtime - Orchestration of the TRON substrate
//!
//! [`RaizSystem`] is an explicit context: it owns the nodes, the gateway,
//! the random source and the scheduler. Each spawned TRON runs a pipeline:
//! 1. Birth on a random node
//! 2. Replication bookkeeping to every peer
//! 3. Propagation through the gateway
//! 4. Delivery to one peer
//! 5. Apoptosis, driven by the owning node's sweep

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod snapshot;
pub mod system;

pub use config::*;
pub use pipeline::*;
pub use snapshot::*;
pub use system::*;
