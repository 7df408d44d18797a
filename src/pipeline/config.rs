//! Pipeline Configuration

use tracing::warn;

use crate::proof::assemble::ProofAssembler;

/// Default number of proofs built at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default number of proofs per pipeline tick.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Proof generation pipeline configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum proofs assembled concurrently.
    pub concurrency: usize,
    /// Maximum proofs taken per batch.
    pub batch_size: usize,
    /// Public base URI of this core, used to derive anchor uris.
    pub core_base_uri: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            core_base_uri: None,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            concurrency: positive(&lookup, "PROOF_GEN_CONCURRENCY").unwrap_or(defaults.concurrency),
            batch_size: positive(&lookup, "PROOF_GEN_BATCH_SIZE").unwrap_or(defaults.batch_size),
            core_base_uri: lookup("CHAINPOINT_CORE_BASE_URI").filter(|uri| !uri.trim().is_empty()),
        }
    }

    /// Assembler configured for this pipeline.
    pub fn assembler(&self) -> ProofAssembler {
        match &self.core_base_uri {
            Some(uri) => ProofAssembler::with_base_uri(uri.clone()),
            None => ProofAssembler::new(),
        }
    }
}

fn positive<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!(key, value = %raw, "ignoring invalid setting");
            None
        }
    }
}
