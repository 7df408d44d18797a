//! Proof Operations
//!
//! A branch is an ordered list of single-step operations over a byte value:
//!
//! ```text
//! {"l": data}        prepend data
//! {"r": data}        append data
//! {"op": "sha-256"}  replace the value with its digest
//! {"anchors": [..]}  record anchors at the current value
//! ```
//!
//! Replay is lenient: a hash name this crate does not know leaves the value
//! unchanged. Shape checking is the schema's job, not replay's.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::encoding::{looks_like_hex, operand_bytes};
use crate::core::hash::{HashAlgorithm, HashValue};
use crate::proof::document::Anchor;

/// Operand of a concat operation.
///
/// Keeps the literal string for the wire and the bytes it stands for,
/// classified once when the operand is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcatData {
    literal: String,
    bytes: Vec<u8>,
}

impl ConcatData {
    /// Classify a literal operand.
    pub fn new(literal: impl Into<String>) -> Self {
        let literal = literal.into();
        let bytes = operand_bytes(&literal);
        Self { literal, bytes }
    }

    /// Operand for raw bytes (hex encoded on the wire).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            literal: hex::encode(bytes),
            bytes: bytes.to_vec(),
        }
    }

    /// The operand as written in the proof.
    pub fn as_str(&self) -> &str {
        &self.literal
    }

    /// The bytes concatenated during replay.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Was the literal read as hex?
    pub fn is_hex(&self) -> bool {
        looks_like_hex(&self.literal)
    }
}

/// Digest named by an `op` step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HashOp {
    /// An algorithm this crate can compute.
    Known(HashAlgorithm),
    /// A name this crate does not know. Replays as a no-op.
    Unrecognized(String),
}

impl HashOp {
    /// Resolve a wire name.
    pub fn from_name(name: &str) -> Self {
        match HashAlgorithm::from_name(name) {
            Some(alg) => Self::Known(alg),
            None => Self::Unrecognized(name.to_string()),
        }
    }

    /// Wire name.
    pub fn name(&self) -> &str {
        match self {
            Self::Known(alg) => alg.name(),
            Self::Unrecognized(name) => name,
        }
    }

    /// Known algorithm, if any.
    pub fn algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            Self::Known(alg) => Some(*alg),
            Self::Unrecognized(_) => None,
        }
    }
}

/// One step of a branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `{"l": data}`: value = data || value
    ConcatLeft(ConcatData),
    /// `{"r": data}`: value = value || data
    ConcatRight(ConcatData),
    /// `{"op": name}`: value = digest(value)
    Hash(HashOp),
    /// `{"anchors": [..]}`: anchors claimed at the current value
    AnchorSet(Vec<Anchor>),
}

impl Operation {
    /// Prepend operand.
    pub fn l(data: impl Into<String>) -> Self {
        Self::ConcatLeft(ConcatData::new(data))
    }

    /// Append operand.
    pub fn r(data: impl Into<String>) -> Self {
        Self::ConcatRight(ConcatData::new(data))
    }

    /// Hash step.
    pub fn hash(alg: HashAlgorithm) -> Self {
        Self::Hash(HashOp::Known(alg))
    }

    /// Hash step by wire name (unknown names are kept as such).
    pub fn hash_named(name: &str) -> Self {
        Self::Hash(HashOp::from_name(name))
    }

    /// Anchor marker.
    pub fn anchors(anchors: Vec<Anchor>) -> Self {
        Self::AnchorSet(anchors)
    }

    /// Anchors held by this op (empty unless it is an anchor marker).
    pub fn anchors_slice(&self) -> &[Anchor] {
        match self {
            Self::AnchorSet(anchors) => anchors,
            _ => &[],
        }
    }

    /// Is this a `sha-256-x2` step?
    pub fn is_double_sha256(&self) -> bool {
        matches!(self, Self::Hash(HashOp::Known(alg)) if alg.is_double_sha256())
    }

    /// Wire key of this op.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ConcatLeft(_) => "l",
            Self::ConcatRight(_) => "r",
            Self::Hash(_) => "op",
            Self::AnchorSet(_) => "anchors",
        }
    }
}

/// Apply a single operation to `current`.
///
/// Pure and total: unrecognized digests and anchor markers pass the value
/// through unchanged.
pub fn apply_op(current: &[u8], op: &Operation) -> HashValue {
    match op {
        Operation::ConcatLeft(data) => {
            let mut out = Vec::with_capacity(data.bytes().len() + current.len());
            out.extend_from_slice(data.bytes());
            out.extend_from_slice(current);
            out
        }
        Operation::ConcatRight(data) => {
            let mut out = Vec::with_capacity(current.len() + data.bytes().len());
            out.extend_from_slice(current);
            out.extend_from_slice(data.bytes());
            out
        }
        Operation::Hash(HashOp::Known(alg)) => alg.digest(current),
        Operation::Hash(HashOp::Unrecognized(_)) | Operation::AnchorSet(_) => current.to_vec(),
    }
}

/// Apply `ops` in order starting from `start`.
pub fn replay(start: &[u8], ops: &[Operation]) -> HashValue {
    ops.iter()
        .fold(start.to_vec(), |value, op| apply_op(&value, op))
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

const OP_KEYS: &[&str] = &["l", "r", "op", "anchors"];

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::ConcatLeft(data) | Self::ConcatRight(data) => {
                map.serialize_entry(self.key(), data.as_str())?
            }
            Self::Hash(op) => map.serialize_entry(self.key(), op.name())?,
            Self::AnchorSet(anchors) => map.serialize_entry(self.key(), anchors)?,
        }
        map.end()
    }
}

struct OperationVisitor;

impl<'de> Visitor<'de> for OperationVisitor {
    type Value = Operation;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an operation object with exactly one of l, r, op, anchors")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Operation, A::Error> {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;

        let op = match key.as_str() {
            "l" => Operation::l(map.next_value::<String>()?),
            "r" => Operation::r(map.next_value::<String>()?),
            "op" => Operation::hash_named(&map.next_value::<String>()?),
            "anchors" => Operation::AnchorSet(map.next_value()?),
            other => return Err(de::Error::unknown_field(other, OP_KEYS)),
        };

        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::invalid_length(2, &self));
        }

        Ok(op)
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OperationVisitor)
    }
}
