//! node.rs
//!
//! Read-only view of a node's consensus state, as reported by `getState`.

use serde::{Deserialize, Serialize};

use super::consensus::types::Value;

/// Snapshot of a node's state.
///
/// Every field except `stopped` is `None` until the node has been started,
/// and stays `None` forever on a faulty node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    /// Set by the administrative stop; not part of the protocol.
    pub stopped: bool,

    /// Current working value `x`.
    pub estimate: Option<Value>,

    /// `None` before start, then `false` until a value is fixed.
    pub decided: Option<bool>,

    /// Current round `k`.
    pub round: Option<u64>,

    /// The final value, once `decided` is `true`.
    pub decided_value: Option<Value>,
}

impl NodeState {
    pub fn is_decided(&self) -> bool {
        self.decided == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unstarted_snapshot_shape() {
        let state = NodeState::default();
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"stopped": false, "estimate": null, "decided": null, "round": null, "decidedValue": null})
        );
    }

    #[test]
    fn test_decided_snapshot_shape() {
        let state = NodeState {
            stopped: false,
            estimate: Some(Value::One),
            decided: Some(true),
            round: Some(2),
            decided_value: Some(Value::One),
        };
        assert!(state.is_decided());
        assert_eq!(serde_json::to_value(&state).unwrap()["decidedValue"], json!(1));
    }
}
