//! Error types for RAIZ
//!
//! Most conditions in the substrate are best-effort no-ops rather than
//! failures. Only precondition violations surface here.

use thiserror::Error;

use crate::NodeId;

/// Core RAIZ errors
#[derive(Error, Debug)]
pub enum RaizError {
    #[error("System is not running: start it before spawning TRONs")]
    SystemNotRunning,

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Invalid valor {0}: expected -1, 0 or 1")]
    InvalidValor(i8),
}

/// Result type for RAIZ operations
pub type RaizResult<T> = Result<T, RaizError>;
