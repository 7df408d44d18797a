//! Sample proof shared by the proof module tests.
//!
//! Expected values were computed independently of this crate.

use crate::core::hash::HashAlgorithm;
use crate::proof::document::{
    Anchor, AnchorType, Branch, Proof, BTC_BRANCH_LABEL, CAL_BRANCH_LABEL, PROOF_CONTEXT,
    PROOF_TYPE,
};
use crate::proof::ops::Operation;

pub const ROOT_HASH: &str = "c617f5faca34474bea7020d75c39cb8427a32145f9646586ecb9184002131ad9";
pub const HASH_ID_NODE: &str = "e477e5c0-2f1b-11e8-b95d-01aa7d8fe8d4";
pub const HASH_ID_CORE: &str = "a5b3e6f0-2f1c-11e8-9c2a-0160cd7ab2cb";
pub const NODE_SUBMITTED_AT: &str = "2018-03-24T04:29:07Z";
pub const CORE_SUBMITTED_AT: &str = "2018-03-24T04:34:32Z";

/// Calendar anchor value (end of the calendar branch).
pub const CAL_EXPECTED: &str = "790cc40a0b3ad60b42a57a0c17249e26128aaa2058973a1aa76ba3311735bc28";

/// Raw accumulator at the end of the Bitcoin branch.
pub const BTC_RAW: &str = "9d0a6a8b47026f42673e172c8d841a56f1232d55af81a8bb1acbd536426f2730";

/// Bitcoin anchor value as reported (byte order reversed).
pub const BTC_EXPECTED: &str = "30276f4236d5cb1abba881af552d23f1561a848d2c173e67426f02478b6a0a9d";

/// Bitcoin branch replayed from the root hash instead of the calendar value.
pub const BTC_FROM_ROOT: &str = "9fa545725bf4e4ac9faeeda620dbfed0701bf212af736345ba64c669f6d5a7f6";

pub const BTC_TX_ID: &str = "172dfba30934952c9e55f66d11b6888d423a0b3fa377f402ac4fc8222eee6514";
pub const OP_RETURN: &str = "78f602176a5f3b0177daa499dee13fa437efc50fecb527cbc0e407543860aa5f";

pub fn agg_ops() -> Vec<Operation> {
    vec![
        Operation::l(format!("node_id:{}", HASH_ID_NODE)),
        Operation::hash(HashAlgorithm::Sha256),
        Operation::r("2C8AB4EC2E6E1C1B0D2AF98B2FE9E1A36A5B2CFB5E48EB69D1A2A7F0B3C2D1E0"),
        Operation::hash(HashAlgorithm::Sha256),
    ]
}

pub fn cal_ops() -> Vec<Operation> {
    vec![
        Operation::l("1832:1521640925:1:https://a.chainpoint.org:cal:1832"),
        Operation::r("e8d74b4d6d1a5de8fd6c9ff0db6c3c9d1b7f8b4c6d1b0b23a3a07c5b8d6e2f11"),
        Operation::hash(HashAlgorithm::Sha256),
    ]
}

pub fn btc_agg_ops() -> Vec<Operation> {
    vec![
        Operation::r("7f3b1c0d9e2a4b6c8d0e1f2a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e"),
        Operation::hash(HashAlgorithm::Sha256),
    ]
}

pub fn btc_tx_ops() -> Vec<Operation> {
    vec![
        Operation::l("0100000001ab"),
        Operation::r("ffffffff0100000000000000002a6a28"),
        Operation::hash(HashAlgorithm::Sha256x2),
    ]
}

pub fn btc_head_ops() -> Vec<Operation> {
    vec![
        Operation::l("11aa22bb33cc44dd55ee66ff778899001a2b3c4d5e6f70819203a4b5c6d7e8f9"),
        Operation::hash(HashAlgorithm::Sha256x2),
        Operation::r("9f8e7d6c5b4a39281706f5e4d3c2b1a0ffeeddccbbaa99887766554433221100"),
        Operation::hash(HashAlgorithm::Sha256x2),
    ]
}

pub fn cal_anchor() -> Anchor {
    Anchor::new(AnchorType::Cal, "1832")
        .with_uris(["https://a.chainpoint.org/calendar/1832/hash"])
}

pub fn btc_anchor() -> Anchor {
    Anchor::new(AnchorType::Btc, "514306")
        .with_uris(["https://a.chainpoint.org/calendar/1890/data"])
}

pub fn cal_branch() -> Branch {
    let mut ops = agg_ops();
    ops.extend(cal_ops());
    ops.push(Operation::anchors(vec![cal_anchor()]));
    Branch::new(CAL_BRANCH_LABEL, ops)
}

pub fn btc_branch() -> Branch {
    let mut ops = btc_agg_ops();
    ops.extend(btc_tx_ops());
    ops.extend(btc_head_ops());
    ops.push(Operation::anchors(vec![btc_anchor()]));
    Branch::new(BTC_BRANCH_LABEL, ops)
}

/// Calendar-only proof.
pub fn cal_proof() -> Proof {
    Proof {
        context: PROOF_CONTEXT.into(),
        proof_type: PROOF_TYPE.into(),
        hash: ROOT_HASH.into(),
        hash_id_node: HASH_ID_NODE.into(),
        hash_submitted_node_at: NODE_SUBMITTED_AT.into(),
        hash_id_core: HASH_ID_CORE.into(),
        hash_submitted_core_at: CORE_SUBMITTED_AT.into(),
        branches: vec![cal_branch()],
    }
}

/// Calendar + Bitcoin proof.
pub fn btc_proof() -> Proof {
    let mut proof = cal_proof();
    proof.branches[0].push_branch(btc_branch());
    proof
}
