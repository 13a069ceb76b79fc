//! TRON definitions
//!
//! A TRON is an ephemeral unit of data. It is born ALIVE on one node,
//! accumulates replica bookkeeping and a delivery mark, and then dies through
//! apoptosis: ALIVE → DYING → DEAD. Nothing leads out of DEAD.
//!
//! Age, remaining TTL and progress are pure functions of the birth time and
//! the caller's notion of "now"; they are never cached.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{NodeId, RaizError, SimTime, TronId};

/// Default hop budget carried by every TRON
pub const DEFAULT_HOPS: u8 = 3;
/// Default time-to-live when none is given
pub const DEFAULT_TTL_SECONDS: u32 = 30;
/// Default potency
pub const DEFAULT_POTENCIA: f64 = 1.0;
/// Default frequency
pub const DEFAULT_FREQUENCIA: f64 = 8.0;

/// Documented potency domain (not enforced)
pub const POTENCIA_RANGE: (f64, f64) = (0.1, 10.0);
/// Documented frequency domain (not enforced)
pub const FREQUENCIA_RANGE: (f64, f64) = (1.0, 50.0);
/// TTL domain used for randomized births, inclusive
pub const TTL_RANGE_SECONDS: (u32, u32) = (10, 30);

/// Ternary signed value carried by a TRON
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Valor {
    Negative,
    Neutral,
    #[default]
    Positive,
}

impl Valor {
    pub const ALL: [Valor; 3] = [Valor::Negative, Valor::Neutral, Valor::Positive];

    #[inline]
    pub fn as_i8(self) -> i8 {
        match self {
            Valor::Negative => -1,
            Valor::Neutral => 0,
            Valor::Positive => 1,
        }
    }
}

impl From<Valor> for i8 {
    fn from(valor: Valor) -> Self {
        valor.as_i8()
    }
}

impl TryFrom<i8> for Valor {
    type Error = RaizError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Valor::Negative),
            0 => Ok(Valor::Neutral),
            1 => Ok(Valor::Positive),
            other => Err(RaizError::InvalidValor(other)),
        }
    }
}

impl fmt::Display for Valor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// Lifecycle state of a TRON
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TronState {
    Alive,
    Dying,
    Dead,
}

impl TronState {
    pub fn as_str(self) -> &'static str {
        match self {
            TronState::Alive => "alive",
            TronState::Dying => "dying",
            TronState::Dead => "dead",
        }
    }

    /// Only single forward steps are lawful
    pub fn can_transition_to(self, next: TronState) -> bool {
        matches!(
            (self, next),
            (TronState::Alive, TronState::Dying) | (TronState::Dying, TronState::Dead)
        )
    }
}

impl fmt::Display for TronState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Birth parameters for a TRON
///
/// Values outside the documented domains are accepted as-is.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TronSpec {
    pub content: Value,
    pub valor: Valor,
    pub potencia: f64,
    pub frequencia: f64,
    pub ttl_seconds: u32,
    pub hops: u8,
}

impl Default for TronSpec {
    fn default() -> Self {
        TronSpec {
            content: Value::Null,
            valor: Valor::Positive,
            potencia: DEFAULT_POTENCIA,
            frequencia: DEFAULT_FREQUENCIA,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            hops: DEFAULT_HOPS,
        }
    }
}

impl TronSpec {
    pub fn new(content: impl Into<Value>) -> Self {
        TronSpec {
            content: content.into(),
            ..TronSpec::default()
        }
    }

    pub fn with_valor(mut self, valor: Valor) -> Self {
        self.valor = valor;
        self
    }

    pub fn with_potencia(mut self, potencia: f64) -> Self {
        self.potencia = potencia;
        self
    }

    pub fn with_frequencia(mut self, frequencia: f64) -> Self {
        self.frequencia = frequencia;
        self
    }

    pub fn with_ttl(mut self, ttl_seconds: u32) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_hops(mut self, hops: u8) -> Self {
        self.hops = hops;
        self
    }
}

/// A living (or dying) TRON
///
/// Fields are private so the lifecycle rules can't be bypassed:
/// `state` only steps forward, `delivered` only flips to true, `replicas`
/// only grows and `ttl_seconds` never changes.
#[derive(Clone, Debug)]
pub struct Tron {
    id: TronId,
    content: Value,
    valor: Valor,
    potencia: f64,
    frequencia: f64,
    ttl_seconds: u32,
    hops: u8,
    created_at: SimTime,
    replicas: BTreeSet<NodeId>,
    state: TronState,
    delivered: bool,
    target_node: Option<NodeId>,
    dying_since: Option<SimTime>,
}

impl Tron {
    /// Birth a TRON at `now` with a fresh identity
    pub fn new(spec: TronSpec, now: SimTime) -> Self {
        Tron {
            id: TronId::generate(now),
            content: spec.content,
            valor: spec.valor,
            potencia: spec.potencia,
            frequencia: spec.frequencia,
            ttl_seconds: spec.ttl_seconds,
            hops: spec.hops,
            created_at: now,
            replicas: BTreeSet::new(),
            state: TronState::Alive,
            delivered: false,
            target_node: None,
            dying_since: None,
        }
    }

    #[inline]
    pub fn id(&self) -> TronId {
        self.id
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn valor(&self) -> Valor {
        self.valor
    }

    pub fn potencia(&self) -> f64 {
        self.potencia
    }

    pub fn frequencia(&self) -> f64 {
        self.frequencia
    }

    pub fn ttl_seconds(&self) -> u32 {
        self.ttl_seconds
    }

    pub fn hops(&self) -> u8 {
        self.hops
    }

    pub fn created_at(&self) -> SimTime {
        self.created_at
    }

    pub fn replicas(&self) -> &BTreeSet<NodeId> {
        &self.replicas
    }

    #[inline]
    pub fn state(&self) -> TronState {
        self.state
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    pub fn target_node(&self) -> Option<&NodeId> {
        self.target_node.as_ref()
    }

    pub fn dying_since(&self) -> Option<SimTime> {
        self.dying_since
    }

    /// Whole seconds since birth
    pub fn age_seconds(&self, now: SimTime) -> u64 {
        now.duration_since(self.created_at).as_secs()
    }

    pub fn ttl_remaining(&self, now: SimTime) -> u64 {
        u64::from(self.ttl_seconds).saturating_sub(self.age_seconds(now))
    }

    /// Percentage of the TTL consumed, capped at 100
    pub fn progress(&self, now: SimTime) -> f64 {
        if self.ttl_seconds == 0 {
            return 100.0;
        }
        let ratio = self.age_seconds(now) as f64 / f64::from(self.ttl_seconds);
        (ratio * 100.0).min(100.0)
    }

    /// Expired or delivered
    pub fn should_die(&self, now: SimTime) -> bool {
        self.age_seconds(now) >= u64::from(self.ttl_seconds) || self.delivered
    }

    /// Record a replica; returns `true` if the node was not already recorded
    pub fn add_replica(&mut self, node: NodeId) -> bool {
        self.replicas.insert(node)
    }

    /// Mark as delivered to `target`. The first target wins; later calls
    /// return `false` and change nothing.
    pub fn mark_delivered(&mut self, target: NodeId) -> bool {
        if self.delivered {
            return false;
        }
        self.delivered = true;
        self.target_node = Some(target);
        true
    }

    /// ALIVE → DYING. No-op (returns `false`) from any other state.
    pub fn trigger_apoptosis(&mut self, now: SimTime) -> bool {
        if self.state != TronState::Alive {
            return false;
        }
        self.state = TronState::Dying;
        self.dying_since = Some(now);
        true
    }

    /// DYING → DEAD once `grace` has elapsed since apoptosis started
    pub fn complete_apoptosis(&mut self, now: SimTime, grace: Duration) -> bool {
        match (self.state, self.dying_since) {
            (TronState::Dying, Some(since)) if now.duration_since(since) >= grace => {
                self.state = TronState::Dead;
                true
            }
            _ => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == TronState::Alive
    }

    pub fn is_dead(&self) -> bool {
        self.state == TronState::Dead
    }
}
