//! Proof Parsing and Verification
//!
//! Replays every branch of a proof to compute the value each anchor must
//! match. Any party can run this without trusting the network that issued
//! the proof; the computed values are then checked against the calendar and
//! the Bitcoin blockchain.

use serde::Serialize;
use tracing::debug;

use crate::core::encoding::reversed_hex;
use crate::proof::binary::{self, CodecError, ProofInput};
use crate::proof::btc::{self, BtcShapeError};
use crate::proof::document::{AnchorType, Branch, Proof, BTC_BRANCH_LABEL};
use crate::proof::ops::{apply_op, Operation};
use crate::proof::schema::{self, SchemaError};

/// Anchor with its recomputed expected value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedAnchor {
    /// Anchor system.
    #[serde(rename = "type")]
    pub anchor_type: AnchorType,
    /// Identifier within the anchor system.
    pub anchor_id: String,
    /// Lookup locations, as given in the proof.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,
    /// Value the anchor system must hold (hex; little-endian for `btc`).
    pub expected_value: String,
}

/// Replayed branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedBranch {
    /// Branch label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Anchors in op order.
    pub anchors: Vec<ParsedAnchor>,
    /// Replayed child branches.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<ParsedBranch>,
    /// OP_RETURN payload (Bitcoin branch only).
    #[serde(rename = "opReturnValue", skip_serializing_if = "Option::is_none")]
    pub op_return_value: Option<String>,
    /// Anchor transaction id (Bitcoin branch only).
    #[serde(rename = "btcTxId", skip_serializing_if = "Option::is_none")]
    pub btc_tx_id: Option<String>,
}

impl ParsedBranch {
    /// Depth-first search for a branch by label, including `self`.
    pub fn find(&self, label: &str) -> Option<&ParsedBranch> {
        if self.label.as_deref() == Some(label) {
            return Some(self);
        }
        self.branches.iter().find_map(|b| b.find(label))
    }
}

/// Result of parsing a proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedProof {
    /// Submitted hash.
    pub hash: String,
    /// Node hash id.
    pub hash_id_node: String,
    /// Node submission time.
    pub hash_submitted_node_at: String,
    /// Core hash id.
    pub hash_id_core: String,
    /// Core submission time.
    pub hash_submitted_core_at: String,
    /// Replayed branches.
    pub branches: Vec<ParsedBranch>,
}

impl ParsedProof {
    /// All anchors of all branches, depth first.
    pub fn expected_values(&self) -> Vec<&ParsedAnchor> {
        fn collect<'a>(branches: &'a [ParsedBranch], out: &mut Vec<&'a ParsedAnchor>) {
            for branch in branches {
                out.extend(branch.anchors.iter());
                collect(&branch.branches, out);
            }
        }
        let mut out = Vec::new();
        collect(&self.branches, &mut out);
        out
    }

    /// First branch with the given label, depth first.
    pub fn branch(&self, label: &str) -> Option<&ParsedBranch> {
        self.branches.iter().find_map(|b| b.find(label))
    }

    /// The Bitcoin branch, if the proof has one.
    pub fn btc_branch(&self) -> Option<&ParsedBranch> {
        self.branch(BTC_BRANCH_LABEL)
    }
}

/// Errors parsing a proof.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Binary or text input could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Structured input failed validation.
    #[error("proof failed schema validation: {0}")]
    Schema(#[from] SchemaError),

    /// Submitted hash is not hex.
    #[error("proof {hash_id}: hash is not hex")]
    InvalidHash {
        /// Core hash id of the proof.
        hash_id: String,
    },

    /// Bitcoin branch metadata could not be extracted.
    #[error("proof {hash_id}: {source}")]
    BtcBranch {
        /// Core hash id of the proof.
        hash_id: String,
        /// Shape problem.
        source: BtcShapeError,
    },
}

/// Parse any accepted proof input and replay it.
pub fn parse(input: impl Into<ProofInput>) -> Result<ParsedProof, ParseError> {
    let proof = match input.into() {
        ProofInput::Document(proof) => {
            schema::validate(&proof)?;
            proof
        }
        ProofInput::Object(value) => schema::validate_value(value)?,
        other => binary::decode(other)?,
    };
    replay_proof(&proof)
}

/// Validate and replay a structured proof.
pub fn parse_proof(proof: &Proof) -> Result<ParsedProof, ParseError> {
    schema::validate(proof)?;
    replay_proof(proof)
}

fn replay_proof(proof: &Proof) -> Result<ParsedProof, ParseError> {
    debug!(hash_id = %proof.hash_id_core, "replaying proof");

    let start = hex::decode(&proof.hash).map_err(|_| ParseError::InvalidHash {
        hash_id: proof.hash_id_core.clone(),
    })?;
    let branches = replay_branches(&start, &proof.branches).map_err(|source| {
        ParseError::BtcBranch {
            hash_id: proof.hash_id_core.clone(),
            source,
        }
    })?;

    Ok(ParsedProof {
        hash: proof.hash.clone(),
        hash_id_node: proof.hash_id_node.clone(),
        hash_submitted_node_at: proof.hash_submitted_node_at.clone(),
        hash_id_core: proof.hash_id_core.clone(),
        hash_submitted_core_at: proof.hash_submitted_core_at.clone(),
        branches,
    })
}

/// Replay sibling branches, each from the same starting value.
fn replay_branches(start: &[u8], branches: &[Branch]) -> Result<Vec<ParsedBranch>, BtcShapeError> {
    branches.iter().map(|branch| replay_branch(start, branch)).collect()
}

fn replay_branch(start: &[u8], branch: &Branch) -> Result<ParsedBranch, BtcShapeError> {
    let mut current = start.to_vec();
    let mut anchors = Vec::new();

    for op in &branch.ops {
        match op {
            Operation::AnchorSet(set) => {
                anchors.extend(set.iter().map(|anchor| ParsedAnchor {
                    anchor_type: anchor.anchor_type.clone(),
                    anchor_id: anchor.anchor_id.clone(),
                    uris: anchor.uris.clone(),
                    expected_value: if anchor.anchor_type.is_little_endian() {
                        reversed_hex(&current)
                    } else {
                        hex::encode(&current)
                    },
                }));
            }
            _ => current = apply_op(&current, op),
        }
    }

    let branches = replay_branches(&current, branch.children())?;

    let (op_return_value, btc_tx_id) = if branch.is_btc_branch() {
        let info = btc::extract_tx_info(start, &branch.ops)?;
        (Some(info.op_return_value), Some(info.tx_id))
    } else {
        (None, None)
    };

    Ok(ParsedBranch {
        label: branch.label.clone(),
        anchors,
        branches,
        op_return_value,
        btc_tx_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoding::reverse_hex_pairs;
    use crate::core::hash::HashAlgorithm;
    use crate::proof::document::{Anchor, CAL_BRANCH_LABEL, ETH_BRANCH_LABEL};
    use crate::proof::ops::replay;
    use crate::proof::testdata;
    use serde_json::json;

    #[test]
    fn test_known_vector_calendar() {
        let parsed = parse(testdata::cal_proof()).unwrap();

        assert_eq!(parsed.hash, testdata::ROOT_HASH);
        assert_eq!(parsed.hash_submitted_node_at, testdata::NODE_SUBMITTED_AT);
        assert_eq!(parsed.branches.len(), 1);

        let cal = &parsed.branches[0];
        assert_eq!(cal.label.as_deref(), Some(CAL_BRANCH_LABEL));
        assert_eq!(cal.anchors.len(), 1);
        assert_eq!(cal.anchors[0].anchor_type, AnchorType::Cal);
        assert_eq!(cal.anchors[0].anchor_id, "1832");
        assert_eq!(cal.anchors[0].expected_value, testdata::CAL_EXPECTED);
        assert!(cal.op_return_value.is_none());
        assert!(cal.btc_tx_id.is_none());
        assert!(parsed.btc_branch().is_none());
    }

    #[test]
    fn test_known_vector_bitcoin() {
        let parsed = parse(testdata::btc_proof()).unwrap();

        let btc = parsed.btc_branch().unwrap();
        assert_eq!(btc.anchors[0].anchor_type, AnchorType::Btc);
        assert_eq!(btc.anchors[0].anchor_id, "514306");
        assert_eq!(btc.anchors[0].expected_value, testdata::BTC_EXPECTED);
        assert_eq!(btc.btc_tx_id.as_deref(), Some(testdata::BTC_TX_ID));
        assert_eq!(btc.op_return_value.as_deref(), Some(testdata::OP_RETURN));
    }

    #[test]
    fn test_same_result_from_every_encoding() {
        let proof = testdata::btc_proof();
        let expected = parse(&proof).unwrap();

        let bytes = binary::encode(&proof).unwrap();
        assert_eq!(parse(bytes).unwrap(), expected);
        assert_eq!(parse(binary::encode_hex(&proof).unwrap()).unwrap(), expected);
        assert_eq!(parse(binary::encode_base64(&proof).unwrap()).unwrap(), expected);
        assert_eq!(parse(proof.to_json_value()).unwrap(), expected);
    }

    #[test]
    fn test_btc_expected_value_is_reversed() {
        let parsed = parse(testdata::btc_proof()).unwrap();
        let btc = parsed.btc_branch().unwrap();

        assert_eq!(
            btc.anchors[0].expected_value,
            reverse_hex_pairs(testdata::BTC_RAW).unwrap()
        );
        // non-btc anchors are never reversed
        assert_eq!(parsed.branches[0].anchors[0].expected_value, testdata::CAL_EXPECTED);
    }

    #[test]
    fn test_nested_branch_starts_from_parent_value() {
        let parsed = parse(testdata::btc_proof()).unwrap();
        let btc = parsed.btc_branch().unwrap();

        let from_root = reverse_hex_pairs(testdata::BTC_FROM_ROOT).unwrap();
        assert_ne!(btc.anchors[0].expected_value, from_root);

        let cal_value = hex::decode(testdata::CAL_EXPECTED).unwrap();
        let raw = replay(&cal_value, &testdata::btc_branch().ops);
        assert_eq!(btc.anchors[0].expected_value, reversed_hex(&raw));
    }

    #[test]
    fn test_siblings_share_start_value() {
        let mut proof = testdata::btc_proof();
        let mut eth_ops = testdata::btc_branch().ops;
        eth_ops.pop();
        eth_ops.push(Operation::anchors(vec![Anchor::new(AnchorType::Eth, "0xabc")]));
        proof.branches[0].push_branch(Branch::new(ETH_BRANCH_LABEL, eth_ops));

        let parsed = parse(&proof).unwrap();
        let eth = parsed.branch(ETH_BRANCH_LABEL).unwrap();

        // same ops as the btc sibling, same start, not reversed
        assert_eq!(eth.anchors[0].expected_value, testdata::BTC_RAW);
        assert!(eth.btc_tx_id.is_none());
    }

    #[test]
    fn test_anchor_reports_value_at_its_position() {
        let mut proof = testdata::cal_proof();
        let nist = Operation::anchors(vec![Anchor::new(AnchorType::Nist, "1521640800:abcd")]);
        proof.branches[0].ops.insert(2, nist);

        let parsed = parse(&proof).unwrap();
        let anchors = &parsed.branches[0].anchors;
        assert_eq!(anchors.len(), 2);

        let root = hex::decode(testdata::ROOT_HASH).unwrap();
        let at_two = replay(&root, &testdata::agg_ops()[..2]);
        assert_eq!(anchors[0].anchor_type, AnchorType::Nist);
        assert_eq!(anchors[0].expected_value, hex::encode(at_two));
        assert_eq!(anchors[1].expected_value, testdata::CAL_EXPECTED);
    }

    #[test]
    fn test_unknown_op_is_tolerated() {
        let mut proof = testdata::cal_proof();
        proof.branches[0].ops.insert(1, Operation::hash_named("sha-9000"));
        proof.branches[0].ops.insert(0, Operation::hash_named("keccak-256"));

        let parsed = parse(&proof).unwrap();
        let root = hex::decode(testdata::ROOT_HASH).unwrap();
        let mut expected_ops = testdata::agg_ops();
        expected_ops.extend(testdata::cal_ops());
        assert_eq!(hex::encode(replay(&root, &expected_ops)), testdata::CAL_EXPECTED);
        assert_eq!(parsed.branches[0].anchors[0].expected_value, testdata::CAL_EXPECTED);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse(testdata::btc_proof()).unwrap();
        let b = parse(testdata::btc_proof()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_input_errors() {
        assert_eq!(
            parse(json!(null)),
            Err(ParseError::Codec(CodecError::MissingInput))
        );
        assert_eq!(
            parse(json!(127)),
            Err(ParseError::Codec(CodecError::WrongType("number")))
        );
        assert_eq!(
            parse("not base64 or hex"),
            Err(ParseError::Codec(CodecError::Unparseable))
        );
        assert!(matches!(parse(json!({"hash": "00"})), Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_invalid_document_rejected() {
        let mut proof = testdata::btc_proof();
        proof.branches[0].branches.as_mut().unwrap()[0]
            .ops
            .retain(|op| !op.is_double_sha256());

        assert!(matches!(parse_proof(&proof), Err(ParseError::Schema(_))));
    }

    #[test]
    fn test_result_json_shape() {
        let parsed = parse(testdata::btc_proof()).unwrap();
        let json = serde_json::to_value(&parsed).unwrap();

        let btc = &json["branches"][0]["branches"][0];
        assert_eq!(btc["label"], BTC_BRANCH_LABEL);
        assert_eq!(btc["opReturnValue"], testdata::OP_RETURN);
        assert_eq!(btc["btcTxId"], testdata::BTC_TX_ID);
        assert_eq!(btc["anchors"][0]["type"], "btc");
        assert!(json["branches"][0].get("btcTxId").is_none());
    }

    #[test]
    fn test_expected_values_flatten() {
        let parsed = parse(testdata::btc_proof()).unwrap();
        let values: Vec<_> = parsed
            .expected_values()
            .iter()
            .map(|a| a.expected_value.as_str())
            .collect();
        assert_eq!(values, vec![testdata::CAL_EXPECTED, testdata::BTC_EXPECTED]);
    }

    #[test]
    fn test_sha3_branch_replays() {
        let mut proof = testdata::cal_proof();
        proof.branches[0].ops.insert(0, Operation::hash(HashAlgorithm::Sha3_256));

        let parsed = parse(&proof).unwrap();
        assert_ne!(parsed.branches[0].anchors[0].expected_value, testdata::CAL_EXPECTED);
    }
}
