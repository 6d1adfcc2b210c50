use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use benor_common::{
    BenOrError, Message, NodeId, NodeState, Phase, Result, Value,
};

use super::{
    coin::CoinSource,
    evaluator::{ConsensusEvaluator, QuorumPolicy, TieBreak, VoteOutcome},
    registry::TallyTable,
};

fn default_true() -> bool {
    true
}

/// Static parameters of one node's engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub node_id: NodeId,
    pub n: usize,
    pub f: usize,
    /// A faulty node never broadcasts and ignores every message.
    #[serde(default)]
    pub faulty: bool,
    #[serde(default)]
    pub tie_break: TieBreak,
    /// After deciding in round r, still propose and vote once in round r + 1.
    #[serde(default = "default_true")]
    pub echo_decision: bool,
    /// Forget tallies of rounds below `current - 1`.
    #[serde(default = "default_true")]
    pub prune_history: bool,
}

impl EngineConfig {
    pub fn new(node_id: NodeId, n: usize, f: usize) -> Self {
        Self {
            node_id,
            n,
            f,
            faulty: false,
            tie_break: TieBreak::default(),
            echo_decision: true,
            prune_history: true,
        }
    }

    pub fn faulty(mut self, faulty: bool) -> Self {
        self.faulty = faulty;
        self
    }
}

/// Per-node Ben-Or state machine.
///
/// The engine never talks to the network: `start` and `handle_message`
/// return the messages the caller must broadcast to all N nodes (itself
/// included). Callers sharing an engine between tasks must serialize
/// access, so that a quorum is acted on exactly once.
pub struct ConsensusEngine {
    config: EngineConfig,
    evaluator: ConsensusEvaluator,
    tallies: TallyTable,
    coin: Box<dyn CoinSource>,

    round: Option<u64>,
    estimate: Option<Value>,
    decided: Option<bool>,
    decided_value: Option<Value>,
    decided_round: Option<u64>,
    stopped: bool,
}

impl ConsensusEngine {
    pub fn new(config: EngineConfig, coin: Box<dyn CoinSource>) -> Result<Self> {
        let policy = QuorumPolicy::new(config.n, config.f)?;
        Ok(Self {
            evaluator: ConsensusEvaluator::new(policy, config.tie_break),
            tallies: TallyTable::new(config.n),
            coin,
            config,
            round: None,
            estimate: None,
            decided: None,
            decided_value: None,
            decided_round: None,
            stopped: false,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.config.node_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> QuorumPolicy {
        self.evaluator.policy
    }

    pub fn is_faulty(&self) -> bool {
        self.config.faulty
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_decided(&self) -> bool {
        self.decided == Some(true)
    }

    pub fn tallies(&self) -> &TallyTable {
        &self.tallies
    }

    pub fn state(&self) -> NodeState {
        NodeState {
            stopped: self.stopped,
            estimate: self.estimate,
            decided: self.decided,
            round: self.round,
            decided_value: self.decided_value,
        }
    }

    /// Freezes the engine. State stays readable.
    pub fn stop(&mut self) {
        if !self.stopped {
            info!("🔴 [{}] stopped at round {:?}", self.config.node_id, self.round);
        }
        self.stopped = true;
    }

    /// Enters round 1 with `initial` and returns the round-1 proposal, plus
    /// whatever the messages that arrived before start now trigger.
    pub fn start(&mut self, initial: Value) -> Result<Vec<Message>> {
        if self.config.faulty {
            info!("💤 [{}] faulty node, not taking part", self.config.node_id);
            return Ok(Vec::new());
        }
        if self.stopped {
            warn!("⚠️ [{}] start ignored: node is stopped", self.config.node_id);
            return Ok(Vec::new());
        }
        if !initial.is_binary() {
            return Err(BenOrError::InvalidInitialValue(initial));
        }
        if self.round.is_some() {
            warn!("⚠️ [{}] start ignored: already running", self.config.node_id);
            return Ok(Vec::new());
        }

        self.round = Some(1);
        self.estimate = Some(initial);
        self.decided = Some(false);
        info!("🚀 [{}] starting Ben-Or with x={}", self.config.node_id, initial);
        tracing::info!(target: "consensus", "EVENT:START node={} x={}", self.config.node_id, initial);

        let mut outbound = vec![Message::proposal(1, initial)];
        self.advance(&mut outbound);
        Ok(outbound)
    }

    /// Records `msg` and returns the broadcasts it triggers (usually none).
    pub fn handle_message(&mut self, msg: Message) -> Vec<Message> {
        if self.config.faulty || self.stopped {
            debug!("[{}] dropping {} (faulty={}, stopped={})", self.config.node_id, msg, self.config.faulty, self.stopped);
            return Vec::new();
        }

        if let Some(current) = self.round {
            if self.config.prune_history && msg.round.saturating_add(1) < current {
                let stale = BenOrError::StaleRound { round: msg.round, current };
                debug!("[{}] ignoring {}: {}", self.config.node_id, msg, stale);
                return Vec::new();
            }
        }

        if !self.tallies.record(msg.round, msg.phase, msg.value) {
            warn!("⚠️ [{}] tally for k={} phase={} is full, dropping duplicate {}", self.config.node_id, msg.round, msg.phase, msg);
            return Vec::new();
        }
        debug!("📥 [{}] recorded {}", self.config.node_id, msg);

        let mut outbound = Vec::new();
        self.advance(&mut outbound);
        outbound
    }

    /// Acts on every quorum that is now actionable, in round order.
    fn advance(&mut self, outbound: &mut Vec<Message>) {
        while self.resolve_proposals(outbound) || self.resolve_votes(outbound) {}

        if self.config.prune_history {
            if let Some(current) = self.round {
                let removed = self.tallies.prune_below(current.saturating_sub(1));
                if removed > 0 {
                    debug!("[{}] pruned {} tallies below k={}", self.config.node_id, removed, current.saturating_sub(1));
                }
            }
        }
    }

    /// Round whose phase-1 quorum this node may still answer.
    fn proposal_round(&self) -> Option<u64> {
        let round = self.round?;
        match self.decided_round {
            None => Some(round),
            Some(decided) if self.config.echo_decision => Some(decided + 1),
            Some(_) => None,
        }
    }

    fn resolve_proposals(&mut self, outbound: &mut Vec<Message>) -> bool {
        let Some(k) = self.proposal_round() else {
            return false;
        };
        let quorum = self.evaluator.policy.quorum();
        let Some(tally) = self.tallies.get_mut(k, Phase::Proposal) else {
            return false;
        };
        if tally.is_resolved() || !tally.has_quorum(quorum) {
            return false;
        }
        tally.mark_resolved();

        let next = self.evaluator.proposal_outcome(tally);
        let (received, zeros, ones) = (tally.len(), tally.count_of(Value::Zero), tally.count_of(Value::One));
        info!(
            "🗳️ [{}] k={} phase 1 quorum ({}/{}): 0s={} 1s={} -> vote {}",
            self.config.node_id, k, received, quorum, zeros, ones, next
        );
        outbound.push(Message::vote(k, next));
        true
    }

    fn resolve_votes(&mut self, outbound: &mut Vec<Message>) -> bool {
        if self.decided_round.is_some() {
            return false;
        }
        let Some(k) = self.round else {
            return false;
        };
        if !self.tallies.is_resolved(k, Phase::Proposal) {
            return false;
        }
        let quorum = self.evaluator.policy.quorum();
        let Some(tally) = self.tallies.get_mut(k, Phase::Vote) else {
            return false;
        };
        if tally.is_resolved() || !tally.has_quorum(quorum) {
            return false;
        }
        tally.mark_resolved();

        let zeros = tally.count_of(Value::Zero);
        let ones = tally.count_of(Value::One);
        match self.evaluator.vote_outcome(tally, self.coin.as_mut()) {
            VoteOutcome::Decide(value) => {
                self.estimate = Some(value);
                self.decided = Some(true);
                self.decided_value = Some(value);
                self.decided_round = Some(k);
                info!("✅ [{}] DECIDED {} at k={} (0s={} 1s={})", self.config.node_id, value, k, zeros, ones);
                tracing::info!(target: "consensus", "EVENT:DECIDE node={} k={} x={}", self.config.node_id, k, value);

                if self.config.echo_decision {
                    outbound.push(Message::proposal(k + 1, value));
                }
            }
            VoteOutcome::Adopt { value, coin } => {
                let next = k + 1;
                self.round = Some(next);
                self.estimate = Some(value);
                if coin {
                    info!("🎲 [{}] k={} no 0/1 vote, coin -> {}; entering k={}", self.config.node_id, k, value, next);
                } else {
                    info!("🔁 [{}] k={} 0s={} 1s={} below f+1, adopting {}; entering k={}", self.config.node_id, k, zeros, ones, value, next);
                }
                tracing::info!(target: "consensus", "EVENT:ROUND node={} k={} x={} coin={}", self.config.node_id, next, value, coin);
                outbound.push(Message::proposal(next, value));
            }
        }
        true
    }
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("tallies", &self.tallies.len())
            .finish()
    }
}
