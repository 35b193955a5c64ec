use thiserror::Error;

use crate::chain::BlockHash;
use crate::deployment::DeploymentId;

/// Consensus failure for a candidate block that breaks a size limit.
///
/// These are final: a block rejected with any of them must never be connected
/// and re-validating it against the same parent yields the same answer.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SizeViolation {
    #[error("block base size {actual} exceeds limit {limit}")]
    BaseSizeExceeded { actual: u64, limit: u64 },
    #[error("block weight {actual} exceeds limit {limit}")]
    WeightExceeded { actual: u64, limit: u64 },
    #[error("block sigop cost {actual} exceeds limit {limit}")]
    SigopsExceeded { actual: u64, limit: u64 },
    #[error("transaction {index} base size {actual} exceeds limit {limit}")]
    TransactionBaseSizeExceeded { index: usize, actual: u64, limit: u64 },
}

impl SizeViolation {
    /// Reject reason as relayed to peers.
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeViolation::BaseSizeExceeded { .. } => "bad-blk-length",
            SizeViolation::WeightExceeded { .. } => "bad-blk-weight",
            SizeViolation::SigopsExceeded { .. } => "bad-blk-sigops",
            SizeViolation::TransactionBaseSizeExceeded { .. } => "bad-txns-oversize",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("deployment {0} registered twice")]
    DuplicateDeployment(DeploymentId),
    #[error("deployment {id}: bit {bit} out of range (max 28)")]
    BitOutOfRange { id: DeploymentId, bit: u8 },
    #[error("deployment {id}: bit {bit} overlaps in time with {other}")]
    BitCollision {
        id: DeploymentId,
        other: DeploymentId,
        bit: u8,
    },
    #[error("deployment {0}: window must be non-zero")]
    EmptyWindow(DeploymentId),
    #[error("deployment {id}: threshold {threshold} outside 1..={window}")]
    ThresholdOutOfRange {
        id: DeploymentId,
        threshold: u32,
        window: u32,
    },
    #[error("deployment {0}: timeout precedes start time")]
    TimeoutBeforeStart(DeploymentId),
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("read params {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse params: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    #[error("{0} must be non-zero")]
    ZeroLimit(&'static str),
    #[error("deployment {0} missing from params")]
    MissingDeployment(DeploymentId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The chain view could not produce an ancestor that its own tip implies
    /// must exist. The view is corrupt; callers should stop validating.
    #[error("chain view missing ancestor at height {height} of {tip}")]
    MissingAncestor { tip: BlockHash, height: u64 },
    #[error("block builds on {got}, not on {expected}")]
    ParentMismatch { expected: BlockHash, got: BlockHash },
    #[error("unknown block {0}")]
    UnknownBlock(BlockHash),
    #[error("block {0} already indexed with different header fields")]
    HeaderMismatch(BlockHash),
    #[error("deployment {0} not registered")]
    UnknownDeployment(DeploymentId),
}

/// Outcome of validating a candidate block against its parent tip.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BlockSizeError {
    #[error(transparent)]
    Violation(#[from] SizeViolation),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
