use serde::Serialize;

use crate::constants::{LIMIT_MULTIPLIER_1X, LIMIT_MULTIPLIER_2X};
use crate::featurebits::ForkState;
use crate::hardfork::HardForkState;
use crate::params::ConsensusParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EffectiveLimits {
    pub max_base_size: u64,
    pub max_weight: u64,
    pub max_sigop_cost: u64,
    /// Buffer bound for witness-inclusive serialization; not a consensus check
    /// on its own since total size never exceeds weight.
    pub max_serialized_size: u64,
}

impl EffectiveLimits {
    pub fn scaled(params: &ConsensusParams, multiplier: u64) -> Self {
        Self {
            max_base_size: params.base_size_1x.saturating_mul(multiplier),
            max_weight: params.weight_1x.saturating_mul(multiplier),
            max_sigop_cost: params.sigop_cost_1x.saturating_mul(multiplier),
            max_serialized_size: params.serialized_size_1x.saturating_mul(multiplier),
        }
    }
}

/// Which activation path (if any) put the doubled limits in force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitRegime {
    Base,
    HardFork,
    Signaled,
    HardForkAndSignaled,
}

impl LimitRegime {
    pub fn from_states(hard_fork: HardForkState, combined: ForkState) -> Self {
        match (hard_fork, combined) {
            (HardForkState::Inactive, ForkState::Active) => LimitRegime::Signaled,
            (HardForkState::Active, ForkState::Active) => LimitRegime::HardForkAndSignaled,
            (HardForkState::Active, _) => LimitRegime::HardFork,
            (HardForkState::Inactive, _) => LimitRegime::Base,
        }
    }

    pub fn multiplier(&self) -> u64 {
        match self {
            LimitRegime::Base => LIMIT_MULTIPLIER_1X,
            LimitRegime::HardFork | LimitRegime::Signaled | LimitRegime::HardForkAndSignaled => {
                LIMIT_MULTIPLIER_2X
            }
        }
    }

    pub fn is_doubled(&self) -> bool {
        self.multiplier() == LIMIT_MULTIPLIER_2X
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitRegime::Base => "base",
            LimitRegime::HardFork => "hard_fork",
            LimitRegime::Signaled => "signaled",
            LimitRegime::HardForkAndSignaled => "hard_fork_and_signaled",
        }
    }
}


#[cfg(kani)]
mod verification {
    use super::LimitRegime;
    use crate::featurebits::ForkState;
    use crate::hardfork::HardForkState;

    /// The multiplier is always 1 or 2, and 2 exactly when some path is active.
    #[kani::proof]
    fn verify_multiplier_bounds() {
        let hf = if kani::any() {
            HardForkState::Active
        } else {
            HardForkState::Inactive
        };
        let s = match kani::any::<u8>() % 5 {
            0 => ForkState::Defined,
            1 => ForkState::Started,
            2 => ForkState::LockedIn,
            3 => ForkState::Active,
            _ => ForkState::Failed,
        };
        let m = LimitRegime::from_states(hf, s).multiplier();
        assert!(m == 1 || m == 2);
        assert_eq!(m == 2, hf == HardForkState::Active || s == ForkState::Active);
    }
}
