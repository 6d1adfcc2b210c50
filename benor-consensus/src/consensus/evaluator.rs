use serde::{Serialize, Deserialize};
use tracing::warn;

use benor_common::{BenOrError, Result, Value};

use super::{coin::CoinSource, registry::RoundTally};

/// Cluster size `n` and tolerated fault count `f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    pub n: usize,
    pub f: usize,
}

impl QuorumPolicy {
    pub fn new(n: usize, f: usize) -> Result<Self> {
        if n == 0 {
            return Err(BenOrError::Config("cluster size must be at least 1".to_string()));
        }
        if f >= n {
            return Err(BenOrError::Config(format!("f={f} must be smaller than n={n}")));
        }
        let policy = Self { n, f };
        if !policy.tolerates_faults() {
            warn!("⚠️ n={} <= 2f={}: agreement and termination are not guaranteed", n, 2 * f);
        }
        Ok(policy)
    }

    /// Responses needed before a tally is trusted: `n - f`.
    pub fn quorum(&self) -> usize {
        self.n - self.f
    }

    /// Strict majority of the whole cluster: `count > n / 2`.
    pub fn is_majority(&self, count: usize) -> bool {
        2 * count > self.n
    }

    /// Votes for one value needed to decide it: `f + 1`.
    pub fn decision_threshold(&self) -> usize {
        self.f + 1
    }

    pub fn tolerates_faults(&self) -> bool {
        self.n > 2 * self.f
    }
}

/// Resolution of equal, non-zero 0/1 vote counts at the end of phase 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Adopt 1 (the reference behaviour).
    #[default]
    PreferOne,
    PreferZero,
    /// Flip the node's coin.
    Coin,
}

/// What a node does once its phase-2 tally reaches quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Fix the value for good.
    Decide(Value),
    /// Carry `value` into the next round. `coin` is true when it was drawn
    /// at random.
    Adopt { value: Value, coin: bool },
}

/// Applies the Ben-Or rules to a tally that has reached quorum.
#[derive(Debug, Clone)]
pub struct ConsensusEvaluator {
    pub policy: QuorumPolicy,
    pub tie_break: TieBreak,
}

impl ConsensusEvaluator {
    pub fn new(policy: QuorumPolicy, tie_break: TieBreak) -> Self {
        Self { policy, tie_break }
    }

    /// Phase 1: the value to vote for, or `Abstain` without a strict majority.
    pub fn proposal_outcome(&self, tally: &RoundTally) -> Value {
        if self.policy.is_majority(tally.count_of(Value::Zero)) {
            Value::Zero
        } else if self.policy.is_majority(tally.count_of(Value::One)) {
            Value::One
        } else {
            Value::Abstain
        }
    }

    /// Phase 2: decide, adopt the leading value, or fall back to the coin.
    pub fn vote_outcome(&self, tally: &RoundTally, coin: &mut dyn CoinSource) -> VoteOutcome {
        let zeros = tally.count_of(Value::Zero);
        let ones = tally.count_of(Value::One);
        let threshold = self.policy.decision_threshold();

        if zeros >= threshold {
            return VoteOutcome::Decide(Value::Zero);
        }
        if ones >= threshold {
            return VoteOutcome::Decide(Value::One);
        }
        if zeros + ones == 0 {
            return VoteOutcome::Adopt { value: coin.flip(), coin: true };
        }

        match zeros.cmp(&ones) {
            std::cmp::Ordering::Greater => VoteOutcome::Adopt { value: Value::Zero, coin: false },
            std::cmp::Ordering::Less => VoteOutcome::Adopt { value: Value::One, coin: false },
            std::cmp::Ordering::Equal => match self.tie_break {
                TieBreak::PreferOne => VoteOutcome::Adopt { value: Value::One, coin: false },
                TieBreak::PreferZero => VoteOutcome::Adopt { value: Value::Zero, coin: false },
                TieBreak::Coin => VoteOutcome::Adopt { value: coin.flip(), coin: true },
            },
        }
    }
}
