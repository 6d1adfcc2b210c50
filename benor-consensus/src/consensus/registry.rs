use std::collections::BTreeMap;

use benor_common::{Phase, Value};

/// Values received for one `(round, phase)` pair, in arrival order.
///
/// Senders are not tracked. The tally holds at most `capacity` (= N)
/// entries; anything past that can only come from duplicate delivery and
/// is refused.
#[derive(Debug, Clone)]
pub struct RoundTally {
    received: Vec<Value>,
    capacity: usize,
    resolved: bool,
}

impl RoundTally {
    pub fn new(capacity: usize) -> Self {
        Self {
            received: Vec::with_capacity(capacity),
            capacity,
            resolved: false,
        }
    }

    /// Appends `value`. Returns `false` (and records nothing) when full.
    pub fn record(&mut self, value: Value) -> bool {
        if self.received.len() >= self.capacity {
            return false;
        }
        self.received.push(value);
        true
    }

    pub fn has_quorum(&self, threshold: usize) -> bool {
        self.received.len() >= threshold
    }

    pub fn count_of(&self, value: Value) -> usize {
        self.received.iter().filter(|v| **v == value).count()
    }

    pub fn len(&self) -> usize {
        self.received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    pub fn received(&self) -> &[Value] {
        &self.received
    }

    /// Whether the quorum of this tally has already been acted on.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn mark_resolved(&mut self) {
        self.resolved = true;
    }
}

/// All tallies of one node, keyed by `(round, phase)` and created lazily.
#[derive(Debug, Clone)]
pub struct TallyTable {
    // (Round, Phase) -> Tally
    tallies: BTreeMap<(u64, Phase), RoundTally>,
    capacity: usize,
}

impl TallyTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            tallies: BTreeMap::new(),
            capacity,
        }
    }

    /// Records `value` into the tally of `(round, phase)`.
    /// Returns `false` if that tally is already full.
    pub fn record(&mut self, round: u64, phase: Phase, value: Value) -> bool {
        let capacity = self.capacity;
        self.tallies
            .entry((round, phase))
            .or_insert_with(|| RoundTally::new(capacity))
            .record(value)
    }

    pub fn get(&self, round: u64, phase: Phase) -> Option<&RoundTally> {
        self.tallies.get(&(round, phase))
    }

    pub fn get_mut(&mut self, round: u64, phase: Phase) -> Option<&mut RoundTally> {
        self.tallies.get_mut(&(round, phase))
    }

    pub fn is_resolved(&self, round: u64, phase: Phase) -> bool {
        self.get(round, phase).map(RoundTally::is_resolved).unwrap_or(false)
    }

    /// Drops every tally for rounds strictly below `round`.
    /// Returns how many tallies were removed.
    pub fn prune_below(&mut self, round: u64) -> usize {
        let before = self.tallies.len();
        self.tallies = self.tallies.split_off(&(round, Phase::Proposal));
        before - self.tallies.len()
    }

    pub fn oldest_round(&self) -> Option<u64> {
        self.tallies.keys().next().map(|(round, _)| *round)
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }
}
