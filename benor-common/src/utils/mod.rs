//! utils.rs
//!
//! Common types shared across the Ben-Or node crates.

pub mod node_id;
pub use node_id::NodeId;
