pub mod block;
pub mod chain;
mod compactsize;
pub mod constants;
pub mod deployment;
pub mod engine;
pub mod error;
pub mod featurebits;
pub mod hardfork;
mod hash;
pub mod limits;
pub mod params;
pub mod sigops;
pub mod validate;

pub use block::{Block, BlockHeader, OutPoint, Transaction, TxIn, TxOut};
pub use chain::{median_time_past, BlockHash, BlockIndex, ChainTipSnapshot, ChainView};
pub use compactsize::{compact_size_len, encode_compact_size};
pub use deployment::{DeploymentId, DeploymentParams, DeploymentRegistry};
pub use engine::BlockSizeEngine;
pub use error::{BlockSizeError, EngineError, ParamsError, RegistryError, SizeViolation};
pub use featurebits::{DeploymentStatus, ForkState, ForkStateCache, SignalStats};
pub use hardfork::{hard_fork_state, is_hard_fork_active, HardForkState};
pub use limits::{EffectiveLimits, LimitRegime};
pub use params::ConsensusParams;
pub use validate::{check_size, measure_block, measure_tx, BlockMeasure, SizeReport, TxMeasure};

#[cfg(test)]
mod featurebits_tests;
