//! Pipeline - the staged life of a spawned TRON
//!
//! Birth → Replication → Propagation → Delivery, each stage scheduled by the
//! previous one. Apoptosis is driven by node sweeps.

use std::fmt;

use raiz_core::{NodeId, TronId};
use serde::Serialize;

/// Pipeline stage, also used as a presentation hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Birth,
    Replication,
    Propagation,
    Delivery,
    Apoptosis,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Birth => "birth",
            PipelineStage::Replication => "replication",
            PipelineStage::Propagation => "propagation",
            PipelineStage::Delivery => "delivery",
            PipelineStage::Apoptosis => "apoptosis",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred work on the system timeline
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Lifecycle sweep of one node
    SweepTick { node: NodeId },
    Replicate { origin: NodeId, tron: TronId },
    Propagate { origin: NodeId, tron: TronId },
    Deliver { origin: NodeId, tron: TronId },
    /// Background spawn coin flip
    AutoSpawn,
    /// Clear the stage hint if nothing replaced it since `epoch`
    ClearStage { epoch: u64 },
}
