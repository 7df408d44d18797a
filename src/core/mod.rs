//! Core byte-level primitives.
//!
//! Everything in this module is pure: digests, hex classification and
//! hash id decoding. The proof engine is built on top of it.

pub mod hash;
pub mod encoding;
pub mod hashid;

// Re-export core types
pub use hash::{HashAlgorithm, HashValue, double_sha256};
pub use encoding::{looks_like_hex, operand_bytes, reversed_hex, reverse_hex_pairs};
pub use hashid::{HashIdError, submitted_at, submitted_at_string};
