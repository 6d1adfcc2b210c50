pub mod builder;
pub mod consensus_driver;
pub mod node;
pub mod readiness;

pub use consensus_driver::{ConsensusDriver, StartOutcome};
pub use node::NodeRuntime;
pub use readiness::{Readiness, ReadySet};
