//! Hash Algorithms for Proof Operations
//!
//! Provides the digest functions a proof may name in an `op` step:
//! - SHA-2 family (sha-224, sha-256, sha-384, sha-512)
//! - SHA-3 family (sha3-224, sha3-256, sha3-384, sha3-512)
//! - Double SHA-256 (sha-256-x2), as used by Bitcoin txids and block merkle trees

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};

/// Raw hash value carried through proof replay.
///
/// Length depends on the algorithm that produced it (or on the submitted
/// hash for the starting value).
pub type HashValue = Vec<u8>;

/// Named digest algorithm usable in a hash operation.
///
/// The wire names are part of the proof format and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    /// `sha-224`
    Sha224,
    /// `sha-256`
    Sha256,
    /// `sha-384`
    Sha384,
    /// `sha-512`
    Sha512,
    /// `sha3-224`
    Sha3_224,
    /// `sha3-256`
    Sha3_256,
    /// `sha3-384`
    Sha3_384,
    /// `sha3-512`
    Sha3_512,
    /// `sha-256-x2`: sha-256 applied twice as one step.
    Sha256x2,
}

impl HashAlgorithm {
    /// All algorithms, in wire-name order.
    pub const ALL: [HashAlgorithm; 9] = [
        HashAlgorithm::Sha224,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
        HashAlgorithm::Sha3_224,
        HashAlgorithm::Sha3_256,
        HashAlgorithm::Sha3_384,
        HashAlgorithm::Sha3_512,
        HashAlgorithm::Sha256x2,
    ];

    /// Wire name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha224 => "sha-224",
            Self::Sha256 => "sha-256",
            Self::Sha384 => "sha-384",
            Self::Sha512 => "sha-512",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
            Self::Sha256x2 => "sha-256-x2",
        }
    }

    /// Look up an algorithm by its exact wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|alg| alg.name() == name)
    }

    /// Digest output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha224 | Self::Sha3_224 => 28,
            Self::Sha256 | Self::Sha3_256 | Self::Sha256x2 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Sha512 | Self::Sha3_512 => 64,
        }
    }

    /// Digest `data` once under this algorithm.
    pub fn digest(&self, data: &[u8]) -> HashValue {
        match self {
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
            Self::Sha3_224 => Sha3_224::digest(data).to_vec(),
            Self::Sha3_256 => Sha3_256::digest(data).to_vec(),
            Self::Sha3_384 => Sha3_384::digest(data).to_vec(),
            Self::Sha3_512 => Sha3_512::digest(data).to_vec(),
            Self::Sha256x2 => double_sha256(data).to_vec(),
        }
    }

    /// Is this the Bitcoin double-hash marker?
    #[inline]
    pub fn is_double_sha256(&self) -> bool {
        matches!(self, Self::Sha256x2)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// SHA-256 of SHA-256.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

// =============================================================================
// TESTS
// =============================================================================
