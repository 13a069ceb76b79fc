//! Snapshots - read-only views for presentation layers

use raiz_core::{NodeId, SimTime, Tron, TronId, TronState, Valor};
use raiz_diffusion::GatewayStatus;
use raiz_state::NodeStatus;
use serde::Serialize;
use serde_json::Value;

use crate::{PipelineStage, RuntimeStats};

/// One TRON as seen at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveTron {
    pub node_id: NodeId,
    pub tron_id: TronId,
    pub state: TronState,
    pub content: Value,
    pub valor: Valor,
    pub potencia: f64,
    pub frequencia: f64,
    pub age_seconds: u64,
    pub ttl_remaining: u64,
    pub replicas: usize,
    pub progress: f64,
    pub delivered: bool,
}

impl LiveTron {
    pub fn observe(node_id: &NodeId, tron: &Tron, now: SimTime) -> Self {
        LiveTron {
            node_id: node_id.clone(),
            tron_id: tron.id(),
            state: tron.state(),
            content: tron.content().clone(),
            valor: tron.valor(),
            potencia: tron.potencia(),
            frequencia: tron.frequencia(),
            age_seconds: tron.age_seconds(now),
            ttl_remaining: tron.ttl_remaining(now),
            replicas: tron.replicas().len(),
            progress: tron.progress(now),
            delivered: tron.is_delivered(),
        }
    }
}

/// Whole-system view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub at: SimTime,
    pub running: bool,
    pub current_stage: Option<PipelineStage>,
    pub nodes: Vec<NodeStatus>,
    pub gateway: GatewayStatus,
    pub trons: Vec<LiveTron>,
    pub runtime: RuntimeStats,
}

impl SystemSnapshot {
    pub fn trons_active(&self) -> usize {
        self.nodes.iter().map(|n| n.trons_active).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
