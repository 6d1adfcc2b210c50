//! consensus
//!
//! Ben-Or randomized binary consensus, one engine per node.
//!
//! Each round has two phases. In phase 1 every node proposes its estimate;
//! once `n - f` proposals are in, it votes for a value holding a strict
//! majority of the cluster, or abstains. In phase 2, once `n - f` votes are
//! in, a value with at least `f + 1` votes is decided; otherwise the node
//! carries the leading value (or a coin flip when every vote abstained)
//! into the next round.

pub mod coin;
mod engine;
pub mod evaluator;
pub mod registry;

pub use engine::{ConsensusEngine, EngineConfig};
