//! Scripted Random - replay exact draw sequences

use std::collections::VecDeque;

use raiz_core::{RandomSource, Valor, TTL_RANGE_SECONDS};

/// Random source that replays a fixed script of unit samples
///
/// Once the script runs out, `fallback` is returned forever.
#[derive(Clone, Debug)]
pub struct ScriptedRandom {
    script: VecDeque<f64>,
    fallback: f64,
    draws: u64,
}

impl ScriptedRandom {
    pub fn new(script: impl IntoIterator<Item = f64>) -> Self {
        ScriptedRandom {
            script: script.into_iter().collect(),
            fallback: 0.5,
            draws: 0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Append samples to the script
    pub fn push(&mut self, samples: impl IntoIterator<Item = f64>) {
        self.script.extend(samples);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Total samples drawn so far
    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.draws += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

/// Unit sample that makes `pick_index(len)` return `idx`
pub fn unit_for_index(idx: usize, len: usize) -> f64 {
    (idx as f64 + 0.5) / len as f64
}

/// Unit sample that makes `valor()` return `valor`
pub fn unit_for_valor(valor: Valor) -> f64 {
    let idx = Valor::ALL.iter().position(|v| *v == valor).unwrap_or(0);
    unit_for_index(idx, Valor::ALL.len())
}

/// Unit sample that makes `ttl_seconds()` return `ttl` (clamped to the
/// randomized TTL domain)
pub fn unit_for_ttl(ttl: u32) -> f64 {
    let (lo, hi) = TTL_RANGE_SECONDS;
    let ttl = ttl.clamp(lo, hi);
    unit_for_index((ttl - lo) as usize, (hi - lo + 1) as usize)
}

/// The five samples `spawn_tron` draws, in order
pub fn spawn_script(node_idx: usize, node_count: usize, valor: Valor, ttl: u32) -> [f64; 5] {
    [
        unit_for_index(node_idx, node_count),
        unit_for_valor(valor),
        0.5,
        0.5,
        unit_for_ttl(ttl),
    ]
}
