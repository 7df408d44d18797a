//! Chainpoint Proof Engine
//!
//! Builds, encodes and verifies proofs:
//! - Proof documents with nested anchoring branches
//! - Assembly from per-stage state fragments
//! - Verification by replaying every branch
//! - Binary codec for storage and transport
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF ENGINE                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ops.rs       - Operations and single-step replay           │
//! │  document.rs  - Proof / Branch / Anchor documents           │
//! │  schema.rs    - Strict document shape validation            │
//! │  assemble.rs  - State fragments → proof                     │
//! │  parse.rs     - Replay → expected anchor values             │
//! │  btc.rs       - Bitcoin txid / OP_RETURN extraction         │
//! │  binary.rs    - msgpack + zlib codec, hex / base64 text     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod ops;
pub mod document;
pub mod schema;
pub mod assemble;
pub mod parse;
pub mod btc;
pub mod binary;

#[cfg(test)]
pub(crate) mod testdata;

// Re-export key types
pub use ops::{apply_op, replay, ConcatData, HashOp, Operation};
pub use document::{
    Anchor, AnchorType, Branch, Proof,
    BTC_BRANCH_LABEL, CAL_BRANCH_LABEL, ETH_BRANCH_LABEL, PROOF_CONTEXT, PROOF_TYPE,
};
pub use schema::{validate, SchemaError};
pub use assemble::{
    AnchorDepth, AssembleError, FragmentAnchor, ProofAssembler, Stage, StageFragments,
    StateFragment, SubmittedHash,
};
pub use parse::{parse, parse_proof, ParseError, ParsedAnchor, ParsedBranch, ParsedProof};
pub use btc::{extract_tx_info, BtcShapeError, BtcTxInfo};
pub use binary::{decode, encode, encode_base64, encode_hex, CodecError, ProofInput};
