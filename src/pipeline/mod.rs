//! Proof Generation Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF PIPELINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config.rs  - Environment-driven settings                   │
//! │  batch.rs   - Bounded concurrent proof building             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod batch;

pub use config::{PipelineConfig, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY};
pub use batch::{
    BatchError, BatchOutcome, EncodedProof, FragmentSource, ProofBatcher, ProofRequest,
    SourceError,
};
