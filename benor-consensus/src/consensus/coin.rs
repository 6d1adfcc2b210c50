use std::fmt;

use rand::{rngs::StdRng, Rng, SeedableRng};

use benor_common::Value;

/// Source of the random choice a node falls back to when a round ends
/// without any 0/1 vote.
pub trait CoinSource: Send {
    /// Returns `Value::Zero` or `Value::One`.
    fn flip(&mut self) -> Value;
}

/// Fair coin backed by a `StdRng`.
pub struct RandomCoin {
    rng: StdRng,
}

impl RandomCoin {
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandomCoin {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomCoin").finish_non_exhaustive()
    }
}

impl CoinSource for RandomCoin {
    fn flip(&mut self) -> Value {
        Value::from_bit(self.rng.gen_bool(0.5))
    }
}

/// Replays a fixed sequence of flips, cycling when exhausted.
/// An empty script always yields `Value::Zero`.
#[derive(Debug, Clone)]
pub struct ScriptedCoin {
    script: Vec<Value>,
    next: usize,
    flips: usize,
}

impl ScriptedCoin {
    pub fn new(script: Vec<Value>) -> Self {
        let script = script.into_iter().filter(Value::is_binary).collect();
        Self { script, next: 0, flips: 0 }
    }

    /// Number of times the coin has been flipped so far.
    pub fn flips(&self) -> usize {
        self.flips
    }
}

impl CoinSource for ScriptedCoin {
    fn flip(&mut self) -> Value {
        self.flips += 1;
        if self.script.is_empty() {
            return Value::Zero;
        }
        let value = self.script[self.next % self.script.len()];
        self.next += 1;
        value
    }
}
