//! RAIZ System - orchestrates nodes, gateway and pipelines on one timeline
//!
//! The system owns the scheduler. Nothing happens between calls: drivers
//! advance virtual time with [`RaizSystem::run_until`] (tests, batch runs)
//! or pace it against the wall clock (demo). Every task due at or before the
//! target time is dispatched in (time, scheduling order).

use std::time::Duration;

use raiz_core::{
    NodeId, RaizError, RaizResult, RandomSource, SeededRandom, SimTime, TronId, TronSpec,
};
use raiz_diffusion::{Gateway, GatewayStatus, Route};
use raiz_state::{DistributedMemory, NodeStatus};
use raiz_time::Scheduler;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{ConfigError, LiveTron, PipelineStage, SystemConfig, SystemSnapshot, Task};

/// Orchestrator counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    pub tasks_dispatched: u64,
    pub sweep_ticks: u64,
    pub trons_spawned: u64,
    pub auto_spawns: u64,
    /// Pipelines that reached delivery
    pub pipelines_completed: u64,
    /// Pipeline stages that found their node stopped or their TRON gone
    pub pipelines_abandoned: u64,
}

/// The simulation context
pub struct RaizSystem {
    config: SystemConfig,
    nodes: Vec<DistributedMemory>,
    gateway: Gateway,
    scheduler: Scheduler<Task>,
    random: Box<dyn RandomSource + Send>,
    running: bool,
    /// An AutoSpawn task is pending
    auto_spawn_active: bool,
    current_stage: Option<PipelineStage>,
    stage_epoch: u64,
    stats: RuntimeStats,
}

impl RaizSystem {
    /// Build a stopped system seeded from OS entropy
    pub fn new(config: SystemConfig) -> Result<Self, ConfigError> {
        Self::with_random(config, Box::new(SeededRandom::from_entropy()))
    }

    /// Build a stopped system drawing from `random`
    pub fn with_random(
        config: SystemConfig,
        random: Box<dyn RandomSource + Send>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let memory_config = config.node.memory_config();
        let nodes = config
            .node_ids
            .iter()
            .map(|id| DistributedMemory::with_config(id.clone(), memory_config.clone()))
            .collect();
        let gateway = Self::fresh_gateway(&config);

        Ok(RaizSystem {
            config,
            nodes,
            gateway,
            scheduler: Scheduler::new(),
            random,
            running: false,
            auto_spawn_active: false,
            current_stage: None,
            stage_epoch: 0,
            stats: RuntimeStats::default(),
        })
    }

    fn fresh_gateway(config: &SystemConfig) -> Gateway {
        Gateway::with_active(|c| config.gateway.is_active(c))
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Start every node and the auto-spawn loop
    pub fn start(&mut self) {
        let interval = self.config.node.sweep_interval;
        for node in &mut self.nodes {
            if node.start() {
                self.scheduler.schedule_after(
                    interval,
                    Task::SweepTick {
                        node: node.node_id().clone(),
                    },
                );
            }
        }

        self.running = true;
        if self.config.auto_spawn.enabled && !self.auto_spawn_active {
            self.auto_spawn_active = true;
            self.scheduler
                .schedule_after(self.config.auto_spawn.interval, Task::AutoSpawn);
        }
        info!(at = %self.now(), nodes = self.nodes.len(), "RAIZ system started");
    }

    /// Stop every node and the orchestrator. State is kept.
    pub fn stop(&mut self) {
        for node in &mut self.nodes {
            node.stop();
        }
        self.running = false;
        info!(at = %self.now(), "RAIZ system stopped");
    }

    /// Birth a TRON with random attributes on a random node and start its
    /// pipeline.
    ///
    /// Draw order: node index, valor, potencia, frequencia, ttl.
    pub fn spawn_tron(&mut self) -> RaizResult<TronId> {
        if !self.running {
            warn!("spawn rejected: system not running");
            return Err(RaizError::SystemNotRunning);
        }

        let idx = self.random.pick_index(self.nodes.len());
        let origin = self.nodes[idx].node_id().clone();
        let spec = TronSpec::new(format!("tron payload @{}ms", self.now().as_millis()))
            .with_valor(self.random.valor())
            .with_potencia(self.random.potencia())
            .with_frequencia(self.random.frequencia())
            .with_ttl(self.random.ttl_seconds());
        self.spawn_on(&origin, spec)
    }

    /// Birth a TRON with explicit attributes on `origin` and start its
    /// pipeline.
    pub fn spawn_on(&mut self, origin: &NodeId, spec: TronSpec) -> RaizResult<TronId> {
        if !self.running {
            warn!("spawn rejected: system not running");
            return Err(RaizError::SystemNotRunning);
        }

        let now = self.now();
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.node_id() == origin)
            .ok_or_else(|| RaizError::UnknownNode(origin.clone()))?;
        let tron = node.create(spec, now).id();

        self.stats.trons_spawned += 1;
        self.set_stage(PipelineStage::Birth);
        self.scheduler.schedule_after(
            self.config.pipeline.replication_delay,
            Task::Replicate {
                origin: origin.clone(),
                tron,
            },
        );
        Ok(tron)
    }

    /// Force every ALIVE TRON on every node into DYING
    pub fn force_apoptosis(&mut self) -> usize {
        let now = self.now();
        let forced: usize = self
            .nodes
            .iter_mut()
            .map(|n| n.force_apoptosis(now))
            .sum();
        self.set_stage(PipelineStage::Apoptosis);
        info!(at = %now, forced, "forced apoptosis on all nodes");
        forced
    }

    /// Stop and wipe everything. Pending tasks stay queued and find nothing
    /// to act on.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.stop();
            node.reset();
        }
        self.gateway = Self::fresh_gateway(&self.config);
        self.current_stage = None;
        self.running = false;
        self.stats = RuntimeStats::default();
        info!(at = %self.now(), "RAIZ system reset");
    }

    // ------------------------------------------------------------------
    // Driving time
    // ------------------------------------------------------------------

    /// Dispatch every task due at or before `t`, then move the clock to `t`.
    /// Returns the number of tasks dispatched.
    pub fn run_until(&mut self, t: SimTime) -> usize {
        let mut dispatched = 0;
        while let Some((at, task)) = self.scheduler.pop_due(t) {
            self.dispatch(at, task);
            dispatched += 1;
        }
        self.scheduler.advance_to(t);
        dispatched
    }

    pub fn run_for(&mut self, d: Duration) -> usize {
        self.run_until(self.now() + d)
    }

    /// Dispatch the next pending task, whenever it is due
    pub fn step(&mut self) -> Option<SimTime> {
        let (at, task) = self.scheduler.pop_due(SimTime::MAX)?;
        self.dispatch(at, task);
        Some(at)
    }

    pub fn next_deadline(&self) -> Option<SimTime> {
        self.scheduler.next_deadline()
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn current_stage(&self) -> Option<PipelineStage> {
        self.current_stage
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    pub fn nodes(&self) -> &[DistributedMemory] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&DistributedMemory> {
        self.nodes.iter().find(|n| n.node_id() == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut DistributedMemory> {
        self.nodes.iter_mut().find(|n| n.node_id() == id)
    }

    pub fn node_statuses(&self) -> Vec<NodeStatus> {
        self.nodes.iter().map(DistributedMemory::status).collect()
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut Gateway {
        &mut self.gateway
    }

    pub fn gateway_status(&self) -> GatewayStatus {
        self.gateway.status()
    }

    /// Every TRON on every node, in node order
    pub fn live_trons(&self) -> Vec<LiveTron> {
        let now = self.now();
        self.nodes
            .iter()
            .flat_map(|n| n.trons().map(move |t| LiveTron::observe(n.node_id(), t, now)))
            .collect()
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            at: self.now(),
            running: self.running,
            current_stage: self.current_stage,
            nodes: self.node_statuses(),
            gateway: self.gateway_status(),
            trons: self.live_trons(),
            runtime: self.stats.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn dispatch(&mut self, now: SimTime, task: Task) {
        self.stats.tasks_dispatched += 1;
        match task {
            Task::SweepTick { node } => self.on_sweep_tick(now, node),
            Task::Replicate { origin, tron } => self.on_replicate(origin, tron),
            Task::Propagate { origin, tron } => self.on_propagate(origin, tron),
            Task::Deliver { origin, tron } => self.on_deliver(origin, tron),
            Task::AutoSpawn => self.on_auto_spawn(),
            Task::ClearStage { epoch } => {
                if epoch == self.stage_epoch {
                    self.current_stage = None;
                }
            }
        }
    }

    fn on_sweep_tick(&mut self, now: SimTime, id: NodeId) {
        let Some(node) = self.nodes.iter_mut().find(|n| *n.node_id() == id) else {
            debug!(node = %id, "sweep tick for unknown node");
            return;
        };
        let Some(report) = node.on_sweep_tick(now) else {
            return;
        };

        self.stats.sweep_ticks += 1;
        self.scheduler
            .schedule_after(self.config.node.sweep_interval, Task::SweepTick { node: id });
        if !report.dying.is_empty() {
            self.set_stage(PipelineStage::Apoptosis);
        }
    }

    fn on_replicate(&mut self, origin: NodeId, tron: TronId) {
        let Some(idx) = self.pipeline_origin(&origin, &tron, PipelineStage::Replication) else {
            return;
        };
        let peers: Vec<NodeId> = self.peer_ids(&origin);
        self.nodes[idx].replicate(&tron, &peers);

        self.set_stage(PipelineStage::Replication);
        self.scheduler.schedule_after(
            self.config.pipeline.propagation_delay,
            Task::Propagate { origin, tron },
        );
    }

    fn on_propagate(&mut self, origin: NodeId, tron: TronId) {
        let Some(idx) = self.pipeline_origin(&origin, &tron, PipelineStage::Propagation) else {
            return;
        };
        let emitted = match self.nodes[idx].get(&tron) {
            Some(t) => self.gateway.propagate(t, Route::All),
            None => 0,
        };
        self.nodes[idx].record_messages_sent(emitted);

        self.set_stage(PipelineStage::Propagation);
        self.scheduler.schedule_after(
            self.config.pipeline.delivery_delay,
            Task::Deliver { origin, tron },
        );
    }

    fn on_deliver(&mut self, origin: NodeId, tron: TronId) {
        let Some(idx) = self.pipeline_origin(&origin, &tron, PipelineStage::Delivery) else {
            return;
        };
        let peers = self.peer_ids(&origin);
        if peers.is_empty() {
            self.abandon(&origin, &tron, PipelineStage::Delivery, "no delivery target");
            return;
        }
        let target = &peers[self.random.pick_index(peers.len())];
        self.nodes[idx].mark_delivered(&tron, target);

        self.stats.pipelines_completed += 1;
        self.set_stage(PipelineStage::Delivery);
    }

    fn on_auto_spawn(&mut self) {
        if !self.running {
            self.auto_spawn_active = false;
            debug!("auto-spawn loop ended");
            return;
        }

        if self.random.chance(self.config.auto_spawn.probability) {
            match self.spawn_tron() {
                Ok(id) => {
                    self.stats.auto_spawns += 1;
                    debug!(tron = %id, "auto-spawned TRON");
                }
                Err(err) => warn!(%err, "auto-spawn failed"),
            }
        }
        self.scheduler
            .schedule_after(self.config.auto_spawn.interval, Task::AutoSpawn);
    }

    /// Index of the origin node if the pipeline can continue
    fn pipeline_origin(
        &mut self,
        origin: &NodeId,
        tron: &TronId,
        stage: PipelineStage,
    ) -> Option<usize> {
        let found = self
            .nodes
            .iter()
            .position(|n| n.node_id() == origin)
            .map(|idx| (idx, &self.nodes[idx]));

        let reason = match found {
            None => "unknown node",
            Some((_, node)) if !node.is_running() => "node stopped",
            Some((_, node)) if !node.contains(tron) => "TRON gone",
            Some((idx, _)) => return Some(idx),
        };
        self.abandon(origin, tron, stage, reason);
        None
    }

    fn abandon(&mut self, origin: &NodeId, tron: &TronId, stage: PipelineStage, reason: &str) {
        self.stats.pipelines_abandoned += 1;
        debug!(node = %origin, tron = %tron, stage = %stage, reason, "pipeline abandoned");
    }

    fn peer_ids(&self, origin: &NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.node_id())
            .filter(|id| *id != origin)
            .cloned()
            .collect()
    }

    fn set_stage(&mut self, stage: PipelineStage) {
        self.current_stage = Some(stage);
        self.stage_epoch += 1;
        self.scheduler.schedule_after(
            self.config.pipeline.stage_linger,
            Task::ClearStage {
                epoch: self.stage_epoch,
            },
        );
    }
}
