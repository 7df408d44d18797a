//! Proof Assembly
//!
//! Splices the op lists persisted by each pipeline stage into the nested
//! branch structure of a proof:
//!
//! ```text
//! branches[0]  cal_anchor_branch   agg ops ++ cal ops ++ {anchors: [cal]}
//!   branches[0]  btc_anchor_branch   btc agg ops ++ btc tx ops ++ btc head ops ++ {anchors: [btc]}
//! ```
//!
//! A calendar proof and a Bitcoin proof for the same hash are separate
//! documents; building the deeper one never modifies the shallower one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::core::hashid::{submitted_at_string, HashIdError};
use crate::proof::document::{
    Anchor, AnchorType, Branch, Proof, BTC_BRANCH_LABEL, CAL_BRANCH_LABEL, PROOF_CONTEXT,
    PROOF_TYPE,
};
use crate::proof::ops::Operation;
use crate::proof::schema::{self, SchemaError};

/// Pipeline stage that produced a state fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Hash → aggregation root.
    Agg,
    /// Aggregation root → calendar block.
    Cal,
    /// Calendar block → Bitcoin anchor aggregation root.
    BtcAgg,
    /// Aggregation root → Bitcoin transaction.
    BtcTx,
    /// Transaction → block merkle root.
    BtcHead,
}

impl Stage {
    /// Stage name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agg => "agg",
            Self::Cal => "cal",
            Self::BtcAgg => "anchor_btc_agg",
            Self::BtcTx => "btctx",
            Self::BtcHead => "btchead",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a proof reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorDepth {
    /// Calendar anchor only.
    #[serde(rename = "cal")]
    Calendar,
    /// Calendar plus Bitcoin anchor.
    #[serde(rename = "btc")]
    Bitcoin,
    /// Calendar plus Ethereum anchor (not built yet).
    #[serde(rename = "eth")]
    Ethereum,
}

impl AnchorDepth {
    /// Wire name of the depth (the anchor type it ends in).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "cal",
            Self::Bitcoin => "btc",
            Self::Ethereum => "eth",
        }
    }
}

impl fmt::Display for AnchorDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnchorDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cal" => Ok(Self::Calendar),
            "btc" => Ok(Self::Bitcoin),
            "eth" => Ok(Self::Ethereum),
            other => Err(format!("unknown anchor depth: {}", other)),
        }
    }
}

/// Anchor record stored alongside a fragment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentAnchor {
    /// Anchor id (calendar block id, Bitcoin block height).
    pub anchor_id: String,

    /// Explicit lookup uris.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,

    /// Calendar block that recorded this anchor, when it differs from `anchor_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_block_id: Option<String>,
}

impl FragmentAnchor {
    /// Anchor record with only an id.
    pub fn new(anchor_id: impl Into<String>) -> Self {
        Self {
            anchor_id: anchor_id.into(),
            uris: None,
            calendar_block_id: None,
        }
    }
}

/// Ops persisted by one pipeline stage. Read-only input to assembly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFragment {
    /// Ordered ops for this stage.
    pub ops: Vec<Operation>,

    /// Anchor record, for the stages that end in an anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<FragmentAnchor>,
}

impl StateFragment {
    /// Fragment without an anchor record.
    pub fn new(ops: Vec<Operation>) -> Self {
        Self { ops, anchor: None }
    }

    /// Attach an anchor record.
    pub fn with_anchor(mut self, anchor: FragmentAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Load a fragment from its stored JSON op list.
    pub fn from_stored(
        stage: Stage,
        ops_json: &str,
        anchor: Option<FragmentAnchor>,
    ) -> Result<Self, AssembleError> {
        let ops: Vec<Operation> =
            serde_json::from_str(ops_json).map_err(|e| AssembleError::MalformedFragment {
                stage,
                reason: e.to_string(),
            })?;
        Ok(Self { ops, anchor })
    }
}

/// Fragments available for one hash, by stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFragments {
    /// Aggregation stage.
    #[serde(default)]
    pub agg: Option<StateFragment>,
    /// Calendar stage.
    #[serde(default)]
    pub cal: Option<StateFragment>,
    /// Bitcoin anchor aggregation stage.
    #[serde(default)]
    pub btc_agg: Option<StateFragment>,
    /// Bitcoin transaction stage.
    #[serde(default)]
    pub btc_tx: Option<StateFragment>,
    /// Bitcoin block header stage.
    #[serde(default)]
    pub btc_head: Option<StateFragment>,
}

impl StageFragments {
    /// Fragment for `stage`, if present.
    pub fn get(&self, stage: Stage) -> Option<&StateFragment> {
        match stage {
            Stage::Agg => self.agg.as_ref(),
            Stage::Cal => self.cal.as_ref(),
            Stage::BtcAgg => self.btc_agg.as_ref(),
            Stage::BtcTx => self.btc_tx.as_ref(),
            Stage::BtcHead => self.btc_head.as_ref(),
        }
    }

    /// Store the fragment for `stage`, replacing any previous one.
    pub fn insert(&mut self, stage: Stage, fragment: StateFragment) {
        let slot = match stage {
            Stage::Agg => &mut self.agg,
            Stage::Cal => &mut self.cal,
            Stage::BtcAgg => &mut self.btc_agg,
            Stage::BtcTx => &mut self.btc_tx,
            Stage::BtcHead => &mut self.btc_head,
        };
        *slot = Some(fragment);
    }

    /// Builder form of [`StageFragments::insert`].
    pub fn with(mut self, stage: Stage, fragment: StateFragment) -> Self {
        self.insert(stage, fragment);
        self
    }
}

/// Hash whose proof is being built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedHash {
    /// Submitted hash, hex.
    pub hash: String,
    /// Node hash id (UUID v1).
    pub hash_id_node: String,
    /// Core hash id (UUID v1).
    pub hash_id_core: String,
}

/// Assembly errors. All are fatal for the proof at the requested depth.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleError {
    /// A stage the depth needs has no fragment.
    #[error("proof {hash_id}: missing {stage} state fragment")]
    MissingFragment {
        /// Core hash id.
        hash_id: String,
        /// Missing stage.
        stage: Stage,
    },

    /// An anchoring stage has no anchor record.
    #[error("proof {hash_id}: {stage} state fragment has no anchor record")]
    MissingAnchor {
        /// Core hash id.
        hash_id: String,
        /// Stage lacking the record.
        stage: Stage,
    },

    /// A stored op list could not be read.
    #[error("malformed {stage} state fragment: {reason}")]
    MalformedFragment {
        /// Stage of the fragment.
        stage: Stage,
        /// Why it could not be read.
        reason: String,
    },

    /// A hash id does not carry a usable timestamp.
    #[error("proof {hash_id}: {source}")]
    HashId {
        /// Core hash id.
        hash_id: String,
        /// Underlying problem.
        source: HashIdError,
    },

    /// The assembled document failed validation and was not emitted.
    #[error("proof {hash_id}: assembled proof failed validation: {source}")]
    Schema {
        /// Core hash id.
        hash_id: String,
        /// Violation.
        source: SchemaError,
    },

    /// The requested depth cannot be built yet.
    #[error("{0} anchoring not yet implemented")]
    NotImplemented(AnchorDepth),
}

/// Builds proofs from stage fragments.
#[derive(Clone, Debug, Default)]
pub struct ProofAssembler {
    /// Base URI used to derive anchor uris when a fragment carries none.
    base_uri: Option<String>,
}

impl ProofAssembler {
    /// Assembler that only uses uris stored in fragments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembler that derives missing uris from `base_uri`.
    pub fn with_base_uri(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: Some(base_uri.into().trim_end_matches('/').to_string()),
        }
    }

    /// Build the proof for `submitted` at `depth`.
    pub fn assemble(
        &self,
        submitted: &SubmittedHash,
        fragments: &StageFragments,
        depth: AnchorDepth,
    ) -> Result<Proof, AssembleError> {
        let hash_id = submitted.hash_id_core.as_str();

        if depth == AnchorDepth::Ethereum {
            warn!(hash_id, "eth proof requested, not yet implemented");
            return Err(AssembleError::NotImplemented(depth));
        }

        let timestamp = |id: &str| {
            submitted_at_string(id).map_err(|source| AssembleError::HashId {
                hash_id: hash_id.to_string(),
                source,
            })
        };
        let hash_submitted_node_at = timestamp(&submitted.hash_id_node)?;
        let hash_submitted_core_at = timestamp(&submitted.hash_id_core)?;

        let mut cal_branch = self.anchored_branch(
            hash_id,
            fragments,
            CAL_BRANCH_LABEL,
            &[Stage::Agg, Stage::Cal],
            AnchorType::Cal,
        )?;

        if depth == AnchorDepth::Bitcoin {
            cal_branch.push_branch(self.anchored_branch(
                hash_id,
                fragments,
                BTC_BRANCH_LABEL,
                &[Stage::BtcAgg, Stage::BtcTx, Stage::BtcHead],
                AnchorType::Btc,
            )?);
        }

        let proof = Proof {
            context: PROOF_CONTEXT.to_string(),
            proof_type: PROOF_TYPE.to_string(),
            hash: submitted.hash.clone(),
            hash_id_node: submitted.hash_id_node.clone(),
            hash_submitted_node_at,
            hash_id_core: submitted.hash_id_core.clone(),
            hash_submitted_core_at,
            branches: vec![cal_branch],
        };

        if let Err(source) = schema::validate(&proof) {
            error!(hash_id, error = %source, "assembled proof failed validation");
            return Err(AssembleError::Schema {
                hash_id: hash_id.to_string(),
                source,
            });
        }

        debug!(hash_id, depth = %depth, "proof assembled");
        Ok(proof)
    }

    /// Concatenate the ops of `stages` in order and close with one anchor.
    ///
    /// The anchor record comes from the last stage.
    fn anchored_branch(
        &self,
        hash_id: &str,
        fragments: &StageFragments,
        label: &str,
        stages: &[Stage],
        anchor_type: AnchorType,
    ) -> Result<Branch, AssembleError> {
        let mut ops = Vec::new();
        let mut last = None;

        for &stage in stages {
            let fragment = fragments
                .get(stage)
                .ok_or_else(|| AssembleError::MissingFragment {
                    hash_id: hash_id.to_string(),
                    stage,
                })?;
            ops.extend(fragment.ops.iter().cloned());
            last = Some((stage, fragment));
        }

        let (stage, fragment) = last.ok_or_else(|| AssembleError::MissingFragment {
            hash_id: hash_id.to_string(),
            stage: Stage::Agg,
        })?;
        let record = fragment
            .anchor
            .as_ref()
            .ok_or_else(|| AssembleError::MissingAnchor {
                hash_id: hash_id.to_string(),
                stage,
            })?;

        ops.push(Operation::anchors(vec![self.anchor(anchor_type, record)]));
        Ok(Branch::new(label, ops))
    }

    fn anchor(&self, anchor_type: AnchorType, record: &FragmentAnchor) -> Anchor {
        let uris = record.uris.clone().or_else(|| {
            let base = self.base_uri.as_ref()?;
            let block_id = record.calendar_block_id.as_ref().unwrap_or(&record.anchor_id);
            let resource = if anchor_type == AnchorType::Btc { "data" } else { "hash" };
            Some(vec![format!("{}/calendar/{}/{}", base, block_id, resource)])
        });

        Anchor {
            anchor_type,
            anchor_id: record.anchor_id.clone(),
            uris,
            expected_value: None,
        }
    }
}
