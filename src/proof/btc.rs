//! Bitcoin Branch Metadata
//!
//! Recovers the anchor transaction id and its OP_RETURN payload from the op
//! list of a `btc_anchor_branch`, by position.
//!
//! The rule relies on the branch shape this system builds:
//!
//! ```text
//! ... btc aggregation ops ...   value = OP_RETURN payload        (index k-3)
//! {"l": tx prefix}                                              (index k-2)
//! {"r": tx suffix}                                              (index k-1)
//! {"op": "sha-256-x2"}          value = txid, internal order     (index k)
//! ... block merkle path (sha-256-x2 steps) ...
//! ```
//!
//! `k` is the index of the first `sha-256-x2` op. Branches of any other
//! shape yield meaningless values; nothing here tries to detect that.

use crate::core::encoding::reversed_hex;
use crate::core::hash::HashValue;
use crate::proof::ops::{apply_op, Operation};

/// Steps between the OP_RETURN payload and the txid hash.
pub const OP_RETURN_OFFSET: usize = 3;

/// Value after each op of a branch replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpResult {
    /// Accumulated value after the op.
    pub value: HashValue,
    /// Is this the first `sha-256-x2` of the walk?
    pub is_first_double_sha256: bool,
}

/// Transaction data extracted from a Bitcoin branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BtcTxInfo {
    /// Transaction id, hex, Bitcoin display order.
    pub tx_id: String,
    /// OP_RETURN payload, hex, not reversed.
    pub op_return_value: String,
}

/// Errors extracting Bitcoin metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BtcShapeError {
    /// The branch has no `sha-256-x2` op.
    #[error("bitcoin branch has no sha-256-x2 op")]
    NoDoubleHash,

    /// The first `sha-256-x2` op is too close to the start of the branch.
    #[error("first sha-256-x2 at op {index} leaves no room for an OP_RETURN value")]
    MarkerTooEarly {
        /// Index of the first `sha-256-x2` op.
        index: usize,
    },
}

/// Replay `ops` from `start`, recording the value after every op.
///
/// One entry per op, so entry indices are op indices.
pub fn op_result_table(start: &[u8], ops: &[Operation]) -> Vec<OpResult> {
    let mut table = Vec::with_capacity(ops.len());
    let mut current = start.to_vec();
    let mut seen_double = false;

    for op in ops {
        current = apply_op(&current, op);
        let is_first = op.is_double_sha256() && !seen_double;
        seen_double |= is_first;
        table.push(OpResult {
            value: current.clone(),
            is_first_double_sha256: is_first,
        });
    }

    table
}

/// Extract txid and OP_RETURN value from a Bitcoin branch.
///
/// `start` is the value the branch starts from (the parent's final value).
pub fn extract_tx_info(start: &[u8], ops: &[Operation]) -> Result<BtcTxInfo, BtcShapeError> {
    let table = op_result_table(start, ops);

    let k = table
        .iter()
        .position(|entry| entry.is_first_double_sha256)
        .ok_or(BtcShapeError::NoDoubleHash)?;
    let payload_index = k
        .checked_sub(OP_RETURN_OFFSET)
        .ok_or(BtcShapeError::MarkerTooEarly { index: k })?;

    Ok(BtcTxInfo {
        tx_id: reversed_hex(&table[k].value),
        op_return_value: hex::encode(&table[payload_index].value),
    })
}
