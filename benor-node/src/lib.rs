pub mod api;
pub mod cli;
pub mod config;
pub mod logging;
pub mod runtime;
pub mod simulation;

pub use config::Config;
pub use runtime::builder::{build_http_runtime, build_runtime};
pub use runtime::node::NodeRuntime;
