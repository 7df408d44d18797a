//! Proof Schema Validation
//!
//! Strict checks on document shape. Runs before a proof is emitted,
//! encoded, or replayed. Operation semantics are not checked here: any
//! well-formed hash name passes, so new digests can appear in proofs before
//! the replay engine understands them.

use crate::core::encoding::{is_hash_hex, looks_like_hex};
use crate::core::hashid::{is_hash_id, is_submitted_at};
use crate::proof::document::{Anchor, Branch, Proof, BTC_BRANCH_LABEL, PROOF_CONTEXT, PROOF_TYPE};
use crate::proof::ops::Operation;

/// Minimum index of the first `sha-256-x2` op in a Bitcoin branch.
///
/// The OP_RETURN value is read three steps before it.
pub const BTC_MARKER_MIN_INDEX: usize = 3;

/// Maximum length of a hash op name.
const MAX_OP_NAME_LEN: usize = 32;

/// A schema violation, located by path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct SchemaError {
    /// Location of the violation (`branches[0].ops[2]`).
    pub path: String,
    /// What is wrong there.
    pub reason: String,
}

impl SchemaError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Validate a proof document.
pub fn validate(proof: &Proof) -> Result<(), SchemaError> {
    if proof.context != PROOF_CONTEXT {
        return Err(SchemaError::new("@context", format!("must be {}", PROOF_CONTEXT)));
    }
    if proof.proof_type != PROOF_TYPE {
        return Err(SchemaError::new("type", format!("must be {}", PROOF_TYPE)));
    }
    if !is_hash_hex(&proof.hash) {
        return Err(SchemaError::new("hash", "must be 20 to 64 bytes of hex"));
    }
    for (field, id) in [
        ("hash_id_node", &proof.hash_id_node),
        ("hash_id_core", &proof.hash_id_core),
    ] {
        if !is_hash_id(id) {
            return Err(SchemaError::new(field, "must be a UUID"));
        }
    }
    for (field, at) in [
        ("hash_submitted_node_at", &proof.hash_submitted_node_at),
        ("hash_submitted_core_at", &proof.hash_submitted_core_at),
    ] {
        if !is_submitted_at(at) {
            return Err(SchemaError::new(field, "must be YYYY-MM-DDTHH:MM:SSZ"));
        }
    }

    validate_branches("branches", &proof.branches)
}

/// Deserialize a JSON value as a proof and validate it.
pub fn validate_value(value: serde_json::Value) -> Result<Proof, SchemaError> {
    if !value.is_object() {
        return Err(SchemaError::new("$", "proof must be an object"));
    }
    let proof: Proof =
        serde_json::from_value(value).map_err(|e| SchemaError::new("$", e.to_string()))?;
    validate(&proof)?;
    Ok(proof)
}

fn validate_branches(path: &str, branches: &[Branch]) -> Result<(), SchemaError> {
    if branches.is_empty() {
        return Err(SchemaError::new(path, "must contain at least one branch"));
    }
    for (i, branch) in branches.iter().enumerate() {
        validate_branch(&format!("{}[{}]", path, i), branch)?;
    }
    Ok(())
}

fn validate_branch(path: &str, branch: &Branch) -> Result<(), SchemaError> {
    if let Some(label) = &branch.label {
        if label.is_empty() {
            return Err(SchemaError::new(format!("{}.label", path), "must not be empty"));
        }
    }
    if branch.ops.is_empty() {
        return Err(SchemaError::new(format!("{}.ops", path), "must contain at least one op"));
    }

    for (i, op) in branch.ops.iter().enumerate() {
        validate_op(&format!("{}.ops[{}]", path, i), op)?;
    }

    if branch.is_btc_branch() {
        match branch.ops.iter().position(Operation::is_double_sha256) {
            Some(k) if k >= BTC_MARKER_MIN_INDEX => {}
            Some(k) => {
                return Err(SchemaError::new(
                    format!("{}.ops[{}]", path, k),
                    format!("{} needs at least {} ops before its first sha-256-x2", BTC_BRANCH_LABEL, BTC_MARKER_MIN_INDEX),
                ))
            }
            None => {
                return Err(SchemaError::new(
                    format!("{}.ops", path),
                    format!("{} must contain a sha-256-x2 op", BTC_BRANCH_LABEL),
                ))
            }
        }
    }

    if let Some(children) = &branch.branches {
        validate_branches(&format!("{}.branches", path), children)?;
    }
    Ok(())
}

fn validate_op(path: &str, op: &Operation) -> Result<(), SchemaError> {
    match op {
        Operation::ConcatLeft(data) | Operation::ConcatRight(data) => {
            if data.as_str().is_empty() {
                return Err(SchemaError::new(path, "concat operand must not be empty"));
            }
        }
        Operation::Hash(hash_op) => {
            let name = hash_op.name();
            let well_formed = !name.is_empty()
                && name.len() <= MAX_OP_NAME_LEN
                && name
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
            if !well_formed {
                return Err(SchemaError::new(path, format!("malformed hash op name {:?}", name)));
            }
        }
        Operation::AnchorSet(anchors) => {
            if anchors.is_empty() {
                return Err(SchemaError::new(path, "anchors must not be empty"));
            }
            for (i, anchor) in anchors.iter().enumerate() {
                validate_anchor(&format!("{}.anchors[{}]", path, i), anchor)?;
            }
        }
    }
    Ok(())
}

fn validate_anchor(path: &str, anchor: &Anchor) -> Result<(), SchemaError> {
    let anchor_type = anchor.anchor_type.as_str();
    if !(2..=16).contains(&anchor_type.len()) || !anchor_type.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(SchemaError::new(
            format!("{}.type", path),
            format!("malformed anchor type {:?}", anchor_type),
        ));
    }
    if anchor.anchor_id.is_empty() {
        return Err(SchemaError::new(format!("{}.anchor_id", path), "must not be empty"));
    }
    if let Some(uris) = &anchor.uris {
        if uris.iter().any(|uri| uri.is_empty()) {
            return Err(SchemaError::new(format!("{}.uris", path), "uris must not be empty"));
        }
    }
    if let Some(expected) = &anchor.expected_value {
        if !looks_like_hex(expected) {
            return Err(SchemaError::new(format!("{}.expected_value", path), "must be hex"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::HashAlgorithm;
    use crate::proof::document::{AnchorType, CAL_BRANCH_LABEL};
    use serde_json::json;

    fn sample_proof() -> Proof {
        let mut cal = Branch::new(
            CAL_BRANCH_LABEL,
            vec![
                Operation::l("node_id:e477e5c0-2f1b-11e8-b95d-01aa7d8fe8d4"),
                Operation::hash(HashAlgorithm::Sha256),
                Operation::anchors(vec![Anchor::new(AnchorType::Cal, "1832")]),
            ],
        );
        cal.push_branch(Branch::new(
            BTC_BRANCH_LABEL,
            vec![
                Operation::r("aa"),
                Operation::hash(HashAlgorithm::Sha256),
                Operation::l("0100"),
                Operation::r("ff00"),
                Operation::hash(HashAlgorithm::Sha256x2),
                Operation::anchors(vec![Anchor::new(AnchorType::Btc, "514306")]),
            ],
        ));

        Proof {
            context: PROOF_CONTEXT.into(),
            proof_type: PROOF_TYPE.into(),
            hash: "c617f5faca34474bea7020d75c39cb8427a32145f9646586ecb9184002131ad9".into(),
            hash_id_node: "e477e5c0-2f1b-11e8-b95d-01aa7d8fe8d4".into(),
            hash_submitted_node_at: "2018-03-24T04:29:07Z".into(),
            hash_id_core: "a5b3e6f0-2f1c-11e8-9c2a-0160cd7ab2cb".into(),
            hash_submitted_core_at: "2018-03-24T04:34:32Z".into(),
            branches: vec![cal],
        }
    }

    #[test]
    fn test_valid_proof_passes() {
        assert!(validate(&sample_proof()).is_ok());
    }

    #[test]
    fn test_header_violations() {
        let mut proof = sample_proof();
        proof.context = "https://w3id.org/chainpoint/v2".into();
        assert_eq!(validate(&proof).unwrap_err().path, "@context");

        let mut proof = sample_proof();
        proof.hash = "xyz".into();
        assert_eq!(validate(&proof).unwrap_err().path, "hash");

        let mut proof = sample_proof();
        proof.hash_id_core = "nope".into();
        assert_eq!(validate(&proof).unwrap_err().path, "hash_id_core");

        let mut proof = sample_proof();
        proof.hash_submitted_node_at = "yesterday".into();
        assert_eq!(validate(&proof).unwrap_err().path, "hash_submitted_node_at");
    }

    #[test]
    fn test_empty_branches_rejected() {
        let mut proof = sample_proof();
        proof.branches.clear();
        assert_eq!(validate(&proof).unwrap_err().path, "branches");
    }

    #[test]
    fn test_unknown_hash_name_is_valid_shape() {
        let mut proof = sample_proof();
        proof.branches[0].ops.insert(0, Operation::hash_named("sha-1024"));
        assert!(validate(&proof).is_ok());

        proof.branches[0].ops.insert(0, Operation::hash_named("SHA 256"));
        assert_eq!(validate(&proof).unwrap_err().path, "branches[0].ops[0]");
    }

    #[test]
    fn test_btc_branch_needs_marker() {
        let mut proof = sample_proof();
        let btc = &mut proof.branches[0].branches.as_mut().unwrap()[0];
        btc.ops.retain(|op| !op.is_double_sha256());

        let err = validate(&proof).unwrap_err();
        assert_eq!(err.path, "branches[0].branches[0].ops");
    }

    #[test]
    fn test_btc_marker_too_early() {
        let mut proof = sample_proof();
        let btc = &mut proof.branches[0].branches.as_mut().unwrap()[0];
        btc.ops.insert(1, Operation::hash(HashAlgorithm::Sha256x2));

        let err = validate(&proof).unwrap_err();
        assert_eq!(err.path, "branches[0].branches[0].ops[1]");
    }

    #[test]
    fn test_empty_anchor_list_rejected() {
        let mut proof = sample_proof();
        proof.branches[0].ops.push(Operation::anchors(vec![]));
        assert_eq!(validate(&proof).unwrap_err().path, "branches[0].ops[3]");
    }

    #[test]
    fn test_validate_value_shape_errors() {
        assert!(validate_value(json!(42)).is_err());
        assert!(validate_value(json!({"hello": "world"})).is_err());

        let value = serde_json::to_value(sample_proof()).unwrap();
        assert_eq!(validate_value(value).unwrap(), sample_proof());
    }
}
