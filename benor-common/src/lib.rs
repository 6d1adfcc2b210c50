pub mod env;
pub mod error;
pub mod utils;

pub use env::consensus::types::{NodeStatus, Phase, Value};
pub use env::message::Message;
pub use env::node::NodeState;
pub use error::{BenOrError, Result};
pub use utils::NodeId;
