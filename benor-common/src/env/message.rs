use std::fmt;

use serde::{Serialize, Deserialize};

use crate::{
    env::consensus::types::{Phase, Value},
    error::BenOrError,
};

/// A phase message exchanged between nodes: `{ round, value, phase }`.
///
/// Instances are valid by construction: `round >= 1`, and `value`/`phase`
/// are in their domains. Untrusted input goes through [`Message::from_json`]
/// or [`Message::from_json_value`], which classify every failure as
/// [`BenOrError::ProtocolViolation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct Message {
    pub round: u64,
    pub value: Value,
    pub phase: Phase,
}

#[derive(Deserialize)]
struct RawMessage {
    round: u64,
    value: Value,
    phase: Phase,
}

impl TryFrom<RawMessage> for Message {
    type Error = BenOrError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        if raw.round == 0 {
            return Err(BenOrError::ProtocolViolation("round must be >= 1".to_string()));
        }
        Ok(Message { round: raw.round, value: raw.value, phase: raw.phase })
    }
}

impl Message {
    pub fn proposal(round: u64, value: Value) -> Self {
        Message { round, value, phase: Phase::Proposal }
    }

    pub fn vote(round: u64, value: Value) -> Self {
        Message { round, value, phase: Phase::Vote }
    }

    pub fn from_json(json: &str) -> Result<Self, BenOrError> {
        serde_json::from_str(json).map_err(|e| BenOrError::ProtocolViolation(e.to_string()))
    }

    pub fn from_json_value(json: serde_json::Value) -> Result<Self, BenOrError> {
        serde_json::from_value(json).map_err(|e| BenOrError::ProtocolViolation(e.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[k={} phase={} x={}]", self.round, self.phase, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_message() {
        let msg = Message::from_json(r#"{"round":3,"value":"abstain","phase":2}"#).unwrap();
        assert_eq!(msg, Message::vote(3, Value::Abstain));

        let msg = Message::from_json_value(json!({"round": 1, "value": 0, "phase": 1})).unwrap();
        assert_eq!(msg, Message::proposal(1, Value::Zero));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Message::proposal(2, Value::One)).unwrap();
        assert_eq!(json, json!({"round": 2, "value": 1, "phase": 1}));
    }

    #[test]
    fn test_malformed_messages_are_protocol_violations() {
        let bad = [
            json!({"round": 0, "value": 0, "phase": 1}),
            json!({"round": -4, "value": 0, "phase": 1}),
            json!({"round": "1", "value": 0, "phase": 1}),
            json!({"round": 1, "value": 7, "phase": 1}),
            json!({"round": 1, "value": 0, "phase": 3}),
            json!({"round": 1, "value": 0}),
            json!({"k": 1, "x": 0, "phase": "Phase: 1"}),
        ];

        for raw in bad {
            let err = Message::from_json_value(raw.clone()).unwrap_err();
            assert!(matches!(err, BenOrError::ProtocolViolation(_)), "{raw} -> {err:?}");
        }
    }
}
