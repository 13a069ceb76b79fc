//! RAIZ Time - Cooperative scheduling on one shared timeline
//!
//! This crate implements:
//! - `Scheduler`: a priority queue of (fire-time, task) pairs. Every deferred
//!   activity in the substrate (lifecycle sweeps, pipeline stages,
//!   auto-spawn) is a task on this queue.
//! - `Pacer`: maps the virtual timeline onto wall-clock instants for
//!   real-time drivers.

pub mod clock;
pub mod scheduler;

pub use clock::*;
pub use scheduler::*;
