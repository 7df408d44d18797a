//! Batch Proof Generation
//!
//! Builds proofs for a batch of hashes on a bounded pool of blocking
//! workers. Fragment storage is reached through [`FragmentSource`]; each
//! item is fetched, assembled and encoded independently, and a failure only
//! affects its own item. Nothing is retried here.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use crate::pipeline::config::PipelineConfig;
use crate::proof::assemble::{AnchorDepth, AssembleError, ProofAssembler, StageFragments, SubmittedHash};
use crate::proof::binary::{self, CodecError};
use crate::proof::document::Proof;

/// Error reported by a fragment store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fragment source error: {0}")]
pub struct SourceError(pub String);

/// Read access to persisted state fragments.
///
/// Implementations may block; they are only called from worker threads.
pub trait FragmentSource: Send + Sync {
    /// Load the fragments needed to build `hash` at `depth`.
    fn fragments(
        &self,
        hash: &SubmittedHash,
        depth: AnchorDepth,
    ) -> Result<StageFragments, SourceError>;
}

/// One proof to build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofRequest {
    /// Hash to build the proof for.
    pub submitted: SubmittedHash,
    /// Requested depth.
    pub depth: AnchorDepth,
}

/// A built proof, ready to store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedProof {
    /// Core hash id.
    pub hash_id_core: String,
    /// Depth the proof reaches.
    pub depth: AnchorDepth,
    /// Structured proof.
    pub proof: Proof,
    /// Base64 binary form.
    pub base64: String,
}

/// Per-item batch errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// Fragments could not be loaded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Proof could not be assembled.
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    /// Proof could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Worker task died.
    #[error("proof worker failed: {0}")]
    Worker(String),
}

/// Result for one request, in request order.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Core hash id of the request.
    pub hash_id_core: String,
    /// Built proof or the reason it was abandoned.
    pub result: Result<EncodedProof, BatchError>,
}

/// Bounded proof builder.
pub struct ProofBatcher {
    config: PipelineConfig,
    assembler: ProofAssembler,
    source: Arc<dyn FragmentSource>,
    permits: Arc<Semaphore>,
}

impl ProofBatcher {
    /// Create a batcher over `source`.
    pub fn new(config: PipelineConfig, source: Arc<dyn FragmentSource>) -> Self {
        let assembler = config.assembler();
        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            config,
            assembler,
            source,
            permits,
        }
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build a single proof on the calling thread.
    pub fn build_one(&self, request: &ProofRequest) -> Result<EncodedProof, BatchError> {
        build_proof(&self.assembler, self.source.as_ref(), request)
    }

    /// Build every request, at most `concurrency` at a time.
    ///
    /// Requests beyond `batch_size` are left for the next tick and are not
    /// in the returned outcomes.
    #[instrument(skip(self, requests), fields(requested = requests.len()))]
    pub async fn run(&self, mut requests: Vec<ProofRequest>) -> Vec<BatchOutcome> {
        if requests.len() > self.config.batch_size {
            warn!(
                deferred = requests.len() - self.config.batch_size,
                "batch larger than batch size"
            );
            requests.truncate(self.config.batch_size);
        }

        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let hash_id = request.submitted.hash_id_core.clone();
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    handles.push((hash_id, Err(BatchError::Worker(e.to_string()))));
                    continue;
                }
            };
            let assembler = self.assembler.clone();
            let source = self.source.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                build_proof(&assembler, source.as_ref(), &request)
            });
            handles.push((hash_id, Ok(handle)));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (hash_id_core, handle) in handles {
            let result = match handle {
                Ok(handle) => handle
                    .await
                    .unwrap_or_else(|e| Err(BatchError::Worker(e.to_string()))),
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                report_failure(&hash_id_core, e);
            }
            outcomes.push(BatchOutcome { hash_id_core, result });
        }

        let built = outcomes.iter().filter(|o| o.result.is_ok()).count();
        info!(built, failed = outcomes.len() - built, "proof batch complete");
        outcomes
    }
}

fn build_proof(
    assembler: &ProofAssembler,
    source: &dyn FragmentSource,
    request: &ProofRequest,
) -> Result<EncodedProof, BatchError> {
    let fragments = source.fragments(&request.submitted, request.depth)?;
    let proof = assembler.assemble(&request.submitted, &fragments, request.depth)?;
    let base64 = binary::encode_base64(&proof)?;

    Ok(EncodedProof {
        hash_id_core: request.submitted.hash_id_core.clone(),
        depth: request.depth,
        proof,
        base64,
    })
}

fn report_failure(hash_id: &str, err: &BatchError) {
    match err {
        BatchError::Assemble(AssembleError::NotImplemented(depth)) => {
            warn!(hash_id, depth = %depth, "proof depth not supported, skipping")
        }
        _ => error!(hash_id, error = %err, "proof construction failed"),
    }
}
