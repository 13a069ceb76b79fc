//! Simulation Harness - drive a system and watch every TRON
//!
//! The harness steps the scheduler one task at a time and observes the whole
//! system after each task. Every TRON gets a recorded history (states,
//! remaining TTL, replicas, delivery) and every observation is checked
//! against the lifecycle rules. A TRON that disappears from its node is
//! recorded as DEAD.
//!
//! Runs are expected to use a non-zero apoptosis grace; with a zero grace a
//! TRON can die within a single sweep and is reported as vanishing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use raiz_core::{
    NodeId, RaizResult, RandomSource, SeededRandom, SimTime, Tron, TronId, TronSpec, TronState,
};
use raiz_diffusion::Channel;
use raiz_runtime::{ConfigError, RaizSystem, SystemConfig};
use tracing::debug;

// ============================================================================
// HISTORY
// ============================================================================

/// Everything observed about one TRON
#[derive(Clone, Debug)]
pub struct TronHistory {
    pub node: NodeId,
    pub born: SimTime,
    pub ttl_seconds: u32,
    /// State changes, first entry is the state at first observation
    pub states: Vec<(SimTime, TronState)>,
    /// Remaining TTL, recorded whenever it changes
    pub ttl_samples: Vec<(SimTime, u64)>,
    pub replicas: usize,
    pub delivered_at: Option<SimTime>,
    pub target: Option<NodeId>,
    /// Removed by a system reset rather than by apoptosis
    pub wiped: bool,
}

impl TronHistory {
    fn new(node: NodeId, tron: &Tron, now: SimTime) -> Self {
        TronHistory {
            node,
            born: tron.created_at(),
            ttl_seconds: tron.ttl_seconds(),
            states: vec![(now, tron.state())],
            ttl_samples: Vec::new(),
            replicas: 0,
            delivered_at: None,
            target: None,
            wiped: false,
        }
    }

    /// When the TRON was first seen in `state`
    pub fn entered(&self, state: TronState) -> Option<SimTime> {
        self.states.iter().find(|(_, s)| *s == state).map(|(t, _)| *t)
    }

    pub fn last_state(&self) -> TronState {
        self.states.last().map_or(TronState::Alive, |(_, s)| *s)
    }

    pub fn is_closed(&self) -> bool {
        self.wiped || self.last_state() == TronState::Dead
    }

    /// Sequence of distinct states, without timestamps
    pub fn state_path(&self) -> Vec<TronState> {
        self.states.iter().map(|(_, s)| *s).collect()
    }
}

/// A broken lifecycle rule
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub at: SimTime,
    pub tron: Option<TronId>,
    pub what: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tron {
            Some(id) => write!(f, "[{}] {}: {}", self.at, id, self.what),
            None => write!(f, "[{}] {}", self.at, self.what),
        }
    }
}

/// Summary of a run
#[derive(Clone, Debug)]
pub struct HarnessReport {
    pub at: SimTime,
    pub trons_observed: usize,
    pub trons_reaped: usize,
    pub trons_live: usize,
    pub gateway_total: u64,
    pub violations: Vec<Violation>,
}

impl HarnessReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct SimulationHarness {
    system: RaizSystem,
    histories: BTreeMap<TronId, TronHistory>,
    /// When each running node was last seen starting
    running_since: BTreeMap<NodeId, SimTime>,
    violations: Vec<Violation>,
    observations: u64,
}

impl SimulationHarness {
    pub fn new(
        config: SystemConfig,
        random: impl RandomSource + Send + 'static,
    ) -> Result<Self, ConfigError> {
        Ok(SimulationHarness {
            system: RaizSystem::with_random(config, Box::new(random))?,
            histories: BTreeMap::new(),
            running_since: BTreeMap::new(),
            violations: Vec::new(),
            observations: 0,
        })
    }

    /// Default configuration without auto-spawn, seeded randomness
    pub fn seeded(seed: u64) -> Result<Self, ConfigError> {
        Self::new(quiet_config(), SeededRandom::new(seed))
    }

    pub fn system(&self) -> &RaizSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut RaizSystem {
        &mut self.system
    }

    pub fn now(&self) -> SimTime {
        self.system.now()
    }

    // ------------------------------------------------------------------
    // Commands (observed)
    // ------------------------------------------------------------------

    pub fn start(&mut self) {
        self.system.start();
        self.observe();
    }

    pub fn stop(&mut self) {
        self.system.stop();
        self.observe();
    }

    pub fn spawn(&mut self) -> RaizResult<TronId> {
        let id = self.system.spawn_tron()?;
        self.observe();
        Ok(id)
    }

    pub fn spawn_on(&mut self, node: &str, spec: TronSpec) -> RaizResult<TronId> {
        let id = self.system.spawn_on(&NodeId::from(node), spec)?;
        self.observe();
        Ok(id)
    }

    pub fn force_apoptosis(&mut self) -> usize {
        let forced = self.system.force_apoptosis();
        self.observe();
        forced
    }

    pub fn reset(&mut self) {
        self.system.reset();
        for history in self.histories.values_mut().filter(|h| !h.is_closed()) {
            history.wiped = true;
        }
        self.observe();
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Run to `t`, observing after every dispatched task
    pub fn run_until(&mut self, t: SimTime) {
        while self.system.next_deadline().is_some_and(|next| next <= t) {
            self.system.step();
            self.observe();
        }
        self.system.run_until(t);
        self.observe();
    }

    pub fn run_for(&mut self, d: Duration) {
        self.run_until(self.now() + d);
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Record the current state of every TRON and check the lifecycle rules
    pub fn observe(&mut self) {
        self.observations += 1;
        let now = self.system.now();
        let config = self.system.config();
        let interval = config.node.sweep_interval;
        let grace = config.node.apoptosis_grace;
        let max_replicas = self.system.nodes().len().saturating_sub(1);

        let mut found = Vec::new();
        let mut seen = BTreeSet::new();

        for node in self.system.nodes() {
            // Timing rules only bind while a node sweeps
            let sweeping_since = if node.is_running() {
                Some(*self.running_since.entry(node.node_id().clone()).or_insert(now))
            } else {
                self.running_since.remove(node.node_id());
                None
            };

            for tron in node.trons() {
                let id = tron.id();
                seen.insert(id);
                let history = self
                    .histories
                    .entry(id)
                    .or_insert_with(|| TronHistory::new(node.node_id().clone(), tron, now));
                let mut flag = |what: String| {
                    found.push(Violation {
                        at: now,
                        tron: Some(id),
                        what,
                    })
                };

                let state = tron.state();
                if state == TronState::Dead {
                    flag("DEAD TRON left in its node".into());
                }
                let last = history.last_state();
                if state != last {
                    if !last.can_transition_to(state) {
                        flag(format!("illegal transition {last} -> {state}"));
                    }
                    history.states.push((now, state));
                }

                let remaining = tron.ttl_remaining(now);
                if let Some((_, prev)) = history.ttl_samples.last() {
                    if remaining > *prev {
                        flag(format!("ttl_remaining grew {prev} -> {remaining}"));
                    }
                }
                if tron.age_seconds(now) >= u64::from(tron.ttl_seconds()) && remaining != 0 {
                    flag(format!("ttl_remaining {remaining} past expiry"));
                }
                if history.ttl_samples.last().map(|(_, r)| *r) != Some(remaining) {
                    history.ttl_samples.push((now, remaining));
                }

                let replicas = tron.replicas().len();
                if replicas < history.replicas {
                    flag(format!("replicas shrank {} -> {replicas}", history.replicas));
                }
                if replicas > max_replicas {
                    flag(format!("{replicas} replicas with {max_replicas} peers"));
                }
                history.replicas = replicas;

                if tron.is_delivered() {
                    match history.delivered_at {
                        None => {
                            history.delivered_at = Some(now);
                            history.target = tron.target_node().cloned();
                        }
                        Some(_) if history.target.as_ref() != tron.target_node() => {
                            flag("delivery target changed".into());
                        }
                        Some(_) => {}
                    }
                }
                if let (Some(at), Some(base)) = (history.delivered_at, sweeping_since) {
                    if state == TronState::Alive && now > at.max(base) + interval {
                        flag("delivered TRON missed its sweep".into());
                    }
                }
                if let (Some(since), Some(base)) = (tron.dying_since(), sweeping_since) {
                    if now > since.max(base) + grace + interval {
                        flag("DYING TRON not reaped".into());
                    }
                }
            }
        }

        for (id, history) in self.histories.iter_mut() {
            if seen.contains(id) || history.is_closed() {
                continue;
            }
            if history.last_state() == TronState::Alive {
                found.push(Violation {
                    at: now,
                    tron: Some(*id),
                    what: "vanished without apoptosis".into(),
                });
            }
            history.states.push((now, TronState::Dead));
        }

        let gateway = self.system.gateway();
        let sum: u64 = Channel::ALL.iter().map(|c| gateway.messages(*c)).sum();
        if gateway.total_messages() != sum {
            found.push(Violation {
                at: now,
                tron: None,
                what: format!(
                    "gateway total {} != channel sum {sum}",
                    gateway.total_messages()
                ),
            });
        }

        for violation in &found {
            debug!(%violation, "lifecycle violation");
        }
        self.violations.extend(found);
    }

    pub fn history(&self, id: &TronId) -> Option<&TronHistory> {
        self.histories.get(id)
    }

    pub fn histories(&self) -> impl Iterator<Item = (&TronId, &TronHistory)> {
        self.histories.iter()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn report(&self) -> HarnessReport {
        let reaped = self
            .histories
            .values()
            .filter(|h| !h.wiped && h.last_state() == TronState::Dead)
            .count();
        HarnessReport {
            at: self.now(),
            trons_observed: self.histories.len(),
            trons_reaped: reaped,
            trons_live: self.system.nodes().iter().map(|n| n.len()).sum(),
            gateway_total: self.system.gateway().total_messages(),
            violations: self.violations.clone(),
        }
    }
}

/// Default configuration with auto-spawn disabled
pub fn quiet_config() -> SystemConfig {
    let mut config = SystemConfig::default();
    config.auto_spawn.enabled = false;
    config
}
