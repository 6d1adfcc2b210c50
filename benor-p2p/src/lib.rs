pub mod http;
pub mod memory;
pub mod ports;

pub use http::HttpBroadcaster;
pub use memory::{MemoryBroadcaster, MemoryBus};
pub use ports::Broadcaster;
