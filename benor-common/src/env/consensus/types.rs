use std::fmt;

use serde::{Serialize, Deserialize};

use crate::error::BenOrError;

/// A binary consensus value, or the "no majority yet" marker.
///
/// On the wire `Zero` and `One` are the integers `0` and `1`, `Abstain` is
/// the string `"abstain"` (`"?"` is also accepted when parsing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "serde_json::Value", try_from = "serde_json::Value")]
pub enum Value {
    Zero,
    One,
    Abstain,
}

impl Value {
    /// True for `Zero` and `One`, the only values a node may decide.
    pub fn is_binary(&self) -> bool {
        !matches!(self, Value::Abstain)
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit { Value::One } else { Value::Zero }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Zero => serde_json::Value::from(0),
            Value::One => serde_json::Value::from(1),
            Value::Abstain => serde_json::Value::from("abstain"),
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = BenOrError;

    fn try_from(raw: serde_json::Value) -> Result<Self, Self::Error> {
        match &raw {
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(Value::Zero),
                Some(1) => Ok(Value::One),
                _ => Err(BenOrError::ProtocolViolation(format!("value out of domain: {raw}"))),
            },
            serde_json::Value::String(s) => s.parse(),
            _ => Err(BenOrError::ProtocolViolation(format!("value out of domain: {raw}"))),
        }
    }
}

impl std::str::FromStr for Value {
    type Err = BenOrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Value::Zero),
            "1" => Ok(Value::One),
            "abstain" | "?" => Ok(Value::Abstain),
            other => Err(BenOrError::ProtocolViolation(format!("value out of domain: {other:?}"))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Value::Zero => "0",
            Value::One => "1",
            Value::Abstain => "abstain",
        };
        write!(f, "{}", s)
    }
}

/// The two sub-steps of a Ben-Or round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    /// Phase 1: nodes broadcast their current estimate.
    Proposal,
    /// Phase 2: nodes broadcast the phase-1 outcome, possibly `Abstain`.
    Vote,
}

impl From<Phase> for u8 {
    fn from(p: Phase) -> Self {
        match p {
            Phase::Proposal => 1,
            Phase::Vote => 2,
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = BenOrError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Phase::Proposal),
            2 => Ok(Phase::Vote),
            other => Err(BenOrError::ProtocolViolation(format!("unknown phase {other}"))),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Liveness report of a node, independent of consensus progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Live,
    Faulty,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Live => write!(f, "live"),
            NodeStatus::Faulty => write!(f, "faulty"),
        }
    }
}
