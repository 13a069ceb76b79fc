//! RAIZ Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the RAIZ substrate:
//! - Identifiers (NodeId, TronId)
//! - Simulation time (SimTime)
//! - TRON entities and their apoptosis state machine
//! - Pluggable random sources for attribute generation

pub mod error;
pub mod id;
pub mod random;
pub mod time;
pub mod tron;

pub use error::*;
pub use id::*;
pub use random::*;
pub use time::*;
pub use tron::*;
