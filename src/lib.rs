//! # Chainpoint Proof Engine
//!
//! Builds, encodes and verifies Chainpoint v3 proofs: self-describing
//! documents that show how a submitted hash was folded, through a list of
//! concatenation and hashing operations, into values published on a
//! calendar and on the Bitcoin blockchain.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CHAINPOINT PROOF                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Byte-level primitives                    │
//! │  ├── hash.rs     - Digest registry (sha2, sha3, sha-256-x2) │
//! │  ├── encoding.rs - Hex operands, byte reversal              │
//! │  └── hashid.rs   - UUID v1 hash ids → submission times      │
//! │                                                             │
//! │  proof/          - Proof engine                             │
//! │  ├── ops.rs      - Operations and replay                    │
//! │  ├── document.rs - Proof / Branch / Anchor                  │
//! │  ├── schema.rs   - Shape validation                         │
//! │  ├── assemble.rs - State fragments → proof                  │
//! │  ├── parse.rs    - Proof → expected anchor values           │
//! │  ├── btc.rs      - Bitcoin txid / OP_RETURN extraction      │
//! │  └── binary.rs   - msgpack + zlib, hex / base64             │
//! │                                                             │
//! │  pipeline/       - Proof generation service side            │
//! │  ├── config.rs   - Environment settings                     │
//! │  └── batch.rs    - Bounded concurrent proof building        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Replay is a pure function of the proof document: the same proof yields
//! the same expected values on any platform. Encoding is canonical, so a
//! proof round-trips through the binary form unchanged.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod proof;
pub mod pipeline;

// Re-export commonly used types
pub use core::hash::{HashAlgorithm, HashValue};
pub use proof::{
    decode, encode, encode_base64, encode_hex, parse, validate, AnchorDepth, Proof,
    ProofAssembler, ParsedProof,
};
pub use pipeline::{PipelineConfig, ProofBatcher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
