//! Proof Document
//!
//! The JSON-shaped proof a client receives. The field names, their order
//! and the string values of anchor types are an external contract shared
//! with third-party verifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::proof::ops::Operation;

/// `@context` value of every proof this crate produces.
pub const PROOF_CONTEXT: &str = "https://w3id.org/chainpoint/v3";

/// `type` value of every proof this crate produces.
pub const PROOF_TYPE: &str = "Chainpoint";

/// Label of the calendar branch.
pub const CAL_BRANCH_LABEL: &str = "cal_anchor_branch";

/// Label of the Bitcoin branch nested under the calendar branch.
pub const BTC_BRANCH_LABEL: &str = "btc_anchor_branch";

/// Label reserved for an Ethereum sibling of the Bitcoin branch.
pub const ETH_BRANCH_LABEL: &str = "eth_anchor_branch";

/// External system an anchor claims a value was embedded in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnchorType {
    /// Calendar chain.
    Cal,
    /// Bitcoin blockchain (values reported little-endian).
    Btc,
    /// Ethereum blockchain.
    Eth,
    /// NIST randomness beacon.
    Nist,
    /// Any other type string, carried through untouched.
    Other(String),
}

impl AnchorType {
    /// Wire string for this anchor type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cal => "cal",
            Self::Btc => "btc",
            Self::Eth => "eth",
            Self::Nist => "nist",
            Self::Other(s) => s,
        }
    }

    /// Do expected values of this type need byte-order reversal?
    pub fn is_little_endian(&self) -> bool {
        matches!(self, Self::Btc)
    }
}

impl From<String> for AnchorType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "cal" => Self::Cal,
            "btc" => Self::Btc,
            "eth" => Self::Eth,
            "nist" => Self::Nist,
            _ => Self::Other(s),
        }
    }
}

impl From<AnchorType> for String {
    fn from(t: AnchorType) -> Self {
        match t {
            AnchorType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AnchorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A claim that the value at this point of a branch is embedded in an
/// external system under `anchor_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Anchor system.
    #[serde(rename = "type")]
    pub anchor_type: AnchorType,

    /// Identifier within the anchor system (calendar block id, block height).
    pub anchor_id: String,

    /// Locations where the anchored value can be looked up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,

    /// Cached expected value. Verifiers recompute this and never trust it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,
}

impl Anchor {
    /// Create an anchor without uris.
    pub fn new(anchor_type: AnchorType, anchor_id: impl Into<String>) -> Self {
        Self {
            anchor_type,
            anchor_id: anchor_id.into(),
            uris: None,
            expected_value: None,
        }
    }

    /// Attach lookup uris.
    pub fn with_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uris = Some(uris.into_iter().map(Into::into).collect());
        self
    }
}

/// A path of operations from a starting hash to one or more anchors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch label (`cal_anchor_branch`, `btc_anchor_branch`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Ordered operations. Order is significant.
    pub ops: Vec<Operation>,

    /// Child branches, each starting from this branch's final value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<Branch>>,
}

impl Branch {
    /// Create a labelled branch with the given ops.
    pub fn new(label: impl Into<String>, ops: Vec<Operation>) -> Self {
        Self {
            label: Some(label.into()),
            ops,
            branches: None,
        }
    }

    /// Append a child branch.
    pub fn push_branch(&mut self, child: Branch) {
        self.branches.get_or_insert_with(Vec::new).push(child);
    }

    /// Child branches (empty slice when there are none).
    pub fn children(&self) -> &[Branch] {
        self.branches.as_deref().unwrap_or(&[])
    }

    /// All anchors recorded by `anchors` ops in this branch, in op order.
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.ops.iter().flat_map(Operation::anchors_slice)
    }

    /// Is this the Bitcoin anchor branch?
    pub fn is_btc_branch(&self) -> bool {
        self.label.as_deref() == Some(BTC_BRANCH_LABEL)
    }

    /// Find a direct child by label.
    pub fn child(&self, label: &str) -> Option<&Branch> {
        self.children()
            .iter()
            .find(|b| b.label.as_deref() == Some(label))
    }
}

/// Complete proof for one submitted hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: String,

    /// Proof type.
    #[serde(rename = "type")]
    pub proof_type: String,

    /// Submitted hash (hex).
    pub hash: String,

    /// Hash id issued by the node.
    pub hash_id_node: String,

    /// Time the node received the hash.
    pub hash_submitted_node_at: String,

    /// Hash id issued by the core.
    pub hash_id_core: String,

    /// Time the core received the hash.
    pub hash_submitted_core_at: String,

    /// Anchoring branches. Never empty.
    pub branches: Vec<Branch>,
}

impl Proof {
    /// The calendar branch, if present.
    pub fn cal_branch(&self) -> Option<&Branch> {
        self.branches
            .iter()
            .find(|b| b.label.as_deref() == Some(CAL_BRANCH_LABEL))
    }

    /// The Bitcoin branch nested under the calendar branch, if present.
    pub fn btc_branch(&self) -> Option<&Branch> {
        self.cal_branch()?.child(BTC_BRANCH_LABEL)
    }

    /// Does this proof carry a Bitcoin anchor?
    pub fn is_btc_anchored(&self) -> bool {
        self.btc_branch().is_some()
    }

    /// Serialize to a JSON value.
    pub fn to_json_value(&self) -> serde_json::Value {
        // Proof contains only strings, vectors and maps.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::HashAlgorithm;

    #[test]
    fn test_anchor_type_strings() {
        for s in ["cal", "btc", "eth", "nist"] {
            let t = AnchorType::from(s.to_string());
            assert!(!matches!(t, AnchorType::Other(_)));
            assert_eq!(t.as_str(), s);
        }
        let other = AnchorType::from("tcal".to_string());
        assert_eq!(other, AnchorType::Other("tcal".into()));
        assert_eq!(String::from(other), "tcal");
        assert!(AnchorType::Btc.is_little_endian());
        assert!(!AnchorType::Cal.is_little_endian());
    }

    #[test]
    fn test_anchor_json_shape() {
        let anchor = Anchor::new(AnchorType::Cal, "1832")
            .with_uris(["https://a.chainpoint.org/calendar/1832/hash"]);
        let json = serde_json::to_value(&anchor).unwrap();

        assert_eq!(json["type"], "cal");
        assert_eq!(json["anchor_id"], "1832");
        assert_eq!(json["uris"][0], "https://a.chainpoint.org/calendar/1832/hash");
        assert!(json.get("expected_value").is_none());
    }

    #[test]
    fn test_branch_helpers() {
        let mut cal = Branch::new(
            CAL_BRANCH_LABEL,
            vec![
                Operation::hash(HashAlgorithm::Sha256),
                Operation::anchors(vec![Anchor::new(AnchorType::Cal, "1")]),
            ],
        );
        assert!(cal.children().is_empty());
        assert_eq!(cal.anchors().count(), 1);

        cal.push_branch(Branch::new(BTC_BRANCH_LABEL, vec![]));
        assert!(cal.child(BTC_BRANCH_LABEL).unwrap().is_btc_branch());
        assert!(cal.child(ETH_BRANCH_LABEL).is_none());
    }

    #[test]
    fn test_proof_key_names() {
        let proof = Proof {
            context: PROOF_CONTEXT.into(),
            proof_type: PROOF_TYPE.into(),
            hash: "ab".repeat(32),
            hash_id_node: "e477e5c0-2f1b-11e8-b95d-01aa7d8fe8d4".into(),
            hash_submitted_node_at: "2018-03-24T04:29:07Z".into(),
            hash_id_core: "e477e5c0-2f1b-11e8-b95d-01aa7d8fe8d4".into(),
            hash_submitted_core_at: "2018-03-24T04:29:07Z".into(),
            branches: vec![Branch::new(CAL_BRANCH_LABEL, vec![])],
        };

        let json = proof.to_json_value();
        assert_eq!(json["@context"], PROOF_CONTEXT);
        assert_eq!(json["type"], PROOF_TYPE);
        assert!(json["branches"][0].get("branches").is_none());
        assert!(proof.cal_branch().is_some());
        assert!(!proof.is_btc_anchored());
    }
}
