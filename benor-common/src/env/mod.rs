pub mod consensus;
pub mod message;
pub mod node;
