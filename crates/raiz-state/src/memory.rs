//! Distributed memory - one node's TRON collection and lifecycle sweep

use std::collections::HashMap;
use std::time::Duration;

use raiz_core::{NodeId, SimTime, Tron, TronId, TronSpec, TronState};
use serde::Serialize;
use tracing::{debug, info};

/// Node configuration
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryConfig {
    /// Interval between lifecycle sweeps
    pub sweep_interval: Duration,
    /// Time a TRON spends DYING before it is DEAD
    pub apoptosis_grace: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            sweep_interval: Duration::from_secs(1),
            apoptosis_grace: Duration::from_secs(2),
        }
    }
}

/// Aggregate counters. Monotonic until `reset`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub trons_created: u64,
    /// One per (TRON, target) replication request
    pub trons_replicated: u64,
    pub trons_deleted: u64,
    /// Gateway channel messages emitted on behalf of this node's TRONs
    pub messages_sent: u64,
    /// ALIVE → DYING transitions detected by the sweep
    pub apoptosis_triggered: u64,
}

/// Read-only status snapshot
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub trons_active: usize,
    pub stats: MemoryStats,
    pub running: bool,
}

/// Outcome of one sweep tick
#[derive(Debug, Default)]
pub struct SweepReport {
    pub at: SimTime,
    /// TRONs that entered DYING this tick
    pub dying: Vec<TronId>,
    /// TRONs that reached DEAD and were removed this tick
    pub reaped: Vec<Tron>,
    /// Collection size after the sweep
    pub remaining: usize,
}

impl SweepReport {
    pub fn is_quiet(&self) -> bool {
        self.dying.is_empty() && self.reaped.is_empty()
    }
}

/// A simulated storage node
///
/// INVARIANT: every TRON in `trons` is ALIVE or DYING. A TRON that reaches
/// DEAD is removed by the same sweep.
#[derive(Debug)]
pub struct DistributedMemory {
    node_id: NodeId,
    trons: HashMap<TronId, Tron>,
    running: bool,
    /// A sweep tick is pending on the scheduler
    sweep_active: bool,
    stats: MemoryStats,
    config: MemoryConfig,
}

impl DistributedMemory {
    pub fn new(node_id: NodeId) -> Self {
        Self::with_config(node_id, MemoryConfig::default())
    }

    pub fn with_config(node_id: NodeId, config: MemoryConfig) -> Self {
        DistributedMemory {
            node_id,
            trons: HashMap::new(),
            running: false,
            sweep_active: false,
            stats: MemoryStats::default(),
            config,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_sweep_active(&self) -> bool {
        self.sweep_active
    }

    /// Start the node.
    ///
    /// Returns `true` when the caller must schedule the first sweep tick.
    /// If a tick is still pending from a previous run, it simply carries on
    /// and no second loop is created.
    pub fn start(&mut self) -> bool {
        self.running = true;
        if self.sweep_active {
            return false;
        }
        self.sweep_active = true;
        info!(node = %self.node_id, "node started");
        true
    }

    /// Stop the node. The next pending sweep tick will be the last.
    pub fn stop(&mut self) {
        if self.running {
            info!(node = %self.node_id, "node stopped");
        }
        self.running = false;
    }

    /// Birth a TRON on this node
    pub fn create(&mut self, spec: TronSpec, now: SimTime) -> &Tron {
        let tron = Tron::new(spec, now);
        let id = tron.id();
        info!(
            node = %self.node_id,
            tron = %id,
            ttl = tron.ttl_seconds(),
            valor = %tron.valor(),
            "TRON created"
        );
        self.stats.trons_created += 1;
        self.trons.entry(id).or_insert(tron)
    }

    /// Record that a TRON was replicated to `targets`.
    ///
    /// Duplicates are absorbed by the replica set but every request is
    /// counted. The node never records itself as a replica. Unknown ids are
    /// ignored. Returns the number of targets processed.
    pub fn replicate(&mut self, id: &TronId, targets: &[NodeId]) -> usize {
        let Some(tron) = self.trons.get_mut(id) else {
            debug!(node = %self.node_id, tron = %id, "replicate: TRON not found");
            return 0;
        };

        let mut processed = 0;
        for target in targets.iter().filter(|t| **t != self.node_id) {
            tron.add_replica(target.clone());
            self.stats.trons_replicated += 1;
            processed += 1;
        }

        info!(
            node = %self.node_id,
            tron = %id,
            targets = processed,
            replicas = tron.replicas().len(),
            "TRON replicated"
        );
        processed
    }

    /// Mark a TRON delivered to `target`.
    ///
    /// Unknown ids are a silent no-op: the TRON may already have died.
    /// Returns `true` if this call performed the delivery.
    pub fn mark_delivered(&mut self, id: &TronId, target: &NodeId) -> bool {
        let Some(tron) = self.trons.get_mut(id) else {
            debug!(node = %self.node_id, tron = %id, "mark_delivered: TRON not found");
            return false;
        };
        let first = tron.mark_delivered(target.clone());
        if first {
            info!(node = %self.node_id, tron = %id, target = %target, "TRON delivered");
        }
        first
    }

    /// Count gateway messages emitted for this node's TRONs
    pub fn record_messages_sent(&mut self, count: u64) {
        self.stats.messages_sent += count;
    }

    /// Scheduler entry point for a sweep tick.
    ///
    /// Returns `None` when the node is stopped: the sweep loop ends here and
    /// the caller must not reschedule.
    pub fn on_sweep_tick(&mut self, now: SimTime) -> Option<SweepReport> {
        if !self.running {
            self.sweep_active = false;
            debug!(node = %self.node_id, "sweep loop ended");
            return None;
        }
        Some(self.sweep(now))
    }

    /// One lifecycle sweep. Every TRON is visited exactly once.
    pub fn sweep(&mut self, now: SimTime) -> SweepReport {
        let grace = self.config.apoptosis_grace;
        let mut report = SweepReport {
            at: now,
            ..SweepReport::default()
        };
        let mut dead = Vec::new();

        for (id, tron) in self.trons.iter_mut() {
            if tron.is_alive() && tron.should_die(now) && tron.trigger_apoptosis(now) {
                self.stats.apoptosis_triggered += 1;
                report.dying.push(*id);
                info!(
                    node = %self.node_id,
                    tron = %id,
                    delivered = tron.is_delivered(),
                    "apoptosis started"
                );
            }

            tron.complete_apoptosis(now, grace);

            if tron.state() == TronState::Dead {
                dead.push(*id);
            }
        }

        for id in dead {
            if let Some(tron) = self.trons.remove(&id) {
                self.stats.trons_deleted += 1;
                info!(node = %self.node_id, tron = %id, "TRON removed (apoptosis complete)");
                report.reaped.push(tron);
            }
        }

        report.remaining = self.trons.len();
        if !report.is_quiet() {
            debug!(
                node = %self.node_id,
                at = %now,
                dying = report.dying.len(),
                reaped = report.reaped.len(),
                remaining = report.remaining,
                "sweep"
            );
        }
        report
    }

    /// Force ALIVE → DYING on every ALIVE TRON, regardless of TTL or
    /// delivery. Returns the number of TRONs affected.
    pub fn force_apoptosis(&mut self, now: SimTime) -> usize {
        let forced = self
            .trons
            .values_mut()
            .filter(|t| t.is_alive())
            .map(|t| t.trigger_apoptosis(now))
            .filter(|triggered| *triggered)
            .count();
        if forced > 0 {
            info!(node = %self.node_id, forced, "forced apoptosis");
        }
        forced
    }

    /// Clear the collection and zero the counters
    pub fn reset(&mut self) {
        self.trons.clear();
        self.stats = MemoryStats::default();
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            node_id: self.node_id.clone(),
            trons_active: self.trons.len(),
            stats: self.stats.clone(),
            running: self.running,
        }
    }

    pub fn get(&self, id: &TronId) -> Option<&Tron> {
        self.trons.get(id)
    }

    pub fn contains(&self, id: &TronId) -> bool {
        self.trons.contains_key(id)
    }

    pub fn trons(&self) -> impl Iterator<Item = &Tron> {
        self.trons.values()
    }

    pub fn len(&self) -> usize {
        self.trons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trons.is_empty()
    }
}
