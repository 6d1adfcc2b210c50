pub mod consensus;

pub use consensus::coin::{CoinSource, RandomCoin, ScriptedCoin};
pub use consensus::evaluator::{ConsensusEvaluator, QuorumPolicy, TieBreak, VoteOutcome};
pub use consensus::registry::{RoundTally, TallyTable};
pub use consensus::{ConsensusEngine, EngineConfig};
