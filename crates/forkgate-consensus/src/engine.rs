use tracing::{debug, warn};

use crate::block::Block;
use crate::chain::{ChainTipSnapshot, ChainView};
use crate::deployment::{DeploymentId, DeploymentParams, DeploymentRegistry};
use crate::error::{BlockSizeError, EngineError, ParamsError, SizeViolation};
use crate::featurebits::{DeploymentStatus, ForkState, ForkStateCache};
use crate::hardfork::{hard_fork_state, HardForkState};
use crate::limits::{EffectiveLimits, LimitRegime};
use crate::params::ConsensusParams;
use crate::validate::{check_size, measure_block, BlockMeasure, SizeReport};

/// Resolves and enforces block size limits for one network.
///
/// Every query is a pure function of the supplied chain view and tip. Internal
/// state is limited to the memo of settled deployment periods, which readers
/// share without serializing on each other.
#[derive(Debug)]
pub struct BlockSizeEngine {
    params: ConsensusParams,
    registry: DeploymentRegistry,
    cache: ForkStateCache,
}

impl BlockSizeEngine {
    pub fn new(params: ConsensusParams) -> Result<Self, ParamsError> {
        let registry = params.registry()?;
        Ok(Self {
            params,
            registry,
            cache: ForkStateCache::new(),
        })
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn registry(&self) -> &DeploymentRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ForkStateCache {
        &self.cache
    }

    fn deployment(&self, id: DeploymentId) -> Result<&DeploymentParams, EngineError> {
        self.registry
            .get(id)
            .ok_or(EngineError::UnknownDeployment(id))
    }

    pub fn get_state<V: ChainView + ?Sized>(
        &self,
        view: &V,
        id: DeploymentId,
        tip: &ChainTipSnapshot,
    ) -> Result<ForkState, EngineError> {
        self.cache.get_state(view, self.deployment(id)?, tip)
    }

    pub fn deployment_status<V: ChainView + ?Sized>(
        &self,
        view: &V,
        id: DeploymentId,
        tip: &ChainTipSnapshot,
    ) -> Result<DeploymentStatus, EngineError> {
        self.cache.deployment_status(view, self.deployment(id)?, tip)
    }

    pub fn hard_fork_state(&self, tip: &ChainTipSnapshot) -> HardForkState {
        hard_fork_state(tip, self.params.hard_fork_threshold)
    }

    pub fn is_hard_fork_active(&self, tip: &ChainTipSnapshot) -> bool {
        self.hard_fork_state(tip) == HardForkState::Active
    }

    /// Segregated witness rides on the combined deployment.
    pub fn is_witness_enabled<V: ChainView + ?Sized>(
        &self,
        view: &V,
        tip: &ChainTipSnapshot,
    ) -> Result<bool, EngineError> {
        Ok(self.get_state(view, DeploymentId::SegwitAndLargerBlocks, tip)? == ForkState::Active)
    }

    pub fn resolve_regime<V: ChainView + ?Sized>(
        &self,
        view: &V,
        tip: &ChainTipSnapshot,
    ) -> Result<LimitRegime, EngineError> {
        let hard_fork = self.hard_fork_state(tip);
        let combined = self.get_state(view, DeploymentId::SegwitAndLargerBlocks, tip)?;
        let regime = LimitRegime::from_states(hard_fork, combined);
        debug!(
            height = tip.height,
            regime = regime.as_str(),
            multiplier = regime.multiplier(),
            hard_fork = hard_fork.as_str(),
            deployment = combined.as_str(),
            "block size regime"
        );
        Ok(regime)
    }

    /// Limits for the block that would extend `tip`.
    pub fn resolve_limits<V: ChainView + ?Sized>(
        &self,
        view: &V,
        tip: &ChainTipSnapshot,
    ) -> Result<EffectiveLimits, EngineError> {
        let regime = self.resolve_regime(view, tip)?;
        Ok(EffectiveLimits::scaled(&self.params, regime.multiplier()))
    }

    /// Measures `block` and checks it against the limits in force on top of
    /// `parent`. Every limit is evaluated; the report lists all violations.
    pub fn check_size<V: ChainView + ?Sized>(
        &self,
        view: &V,
        block: &Block,
        parent: &ChainTipSnapshot,
    ) -> Result<(BlockMeasure, SizeReport), EngineError> {
        if block.header.prev_block_hash != parent.hash {
            return Err(EngineError::ParentMismatch {
                expected: parent.hash,
                got: block.header.prev_block_hash,
            });
        }
        let regime = self.resolve_regime(view, parent)?;
        let limits = EffectiveLimits::scaled(&self.params, regime.multiplier());
        let m = measure_block(block);
        let report = check_size(&m, &limits, self.params.max_tx_base_size);

        if report.is_ok() {
            debug!(
                parent_height = parent.height,
                regime = regime.as_str(),
                base_size = m.base_size,
                weight = m.weight,
                sigop_cost = m.sigop_cost,
                "block size accepted"
            );
        } else {
            let reasons: Vec<&str> = report.violations.iter().map(SizeViolation::as_str).collect();
            warn!(
                parent_height = parent.height,
                block = %block.hash(),
                regime = regime.as_str(),
                base_size = m.base_size,
                weight = m.weight,
                sigop_cost = m.sigop_cost,
                reasons = ?reasons,
                "block size rejected"
            );
        }
        Ok((m, report))
    }

    /// Limits are always taken from the parent: a block cannot activate rules
    /// for itself.
    pub fn validate_size<V: ChainView + ?Sized>(
        &self,
        view: &V,
        block: &Block,
        parent: &ChainTipSnapshot,
    ) -> Result<(), BlockSizeError> {
        let (_, report) = self.check_size(view, block, parent)?;
        report.into_result()?;
        Ok(())
    }
}
