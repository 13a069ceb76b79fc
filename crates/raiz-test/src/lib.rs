//! RAIZ Test Harness - Deterministic lifecycle simulation
//!
//! This crate provides:
//! - Scripted random sources for exact replays
//! - A simulation harness that records every TRON's observed history
//! - Invariant checking over whole runs
//! - End-to-end lifecycle scenarios

pub mod harness;
pub mod scripted;

#[cfg(test)]
mod scenarios;

pub use harness::*;
pub use scripted::*;
