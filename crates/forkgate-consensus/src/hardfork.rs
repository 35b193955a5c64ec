use serde::Serialize;

use crate::chain::ChainTipSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HardForkState {
    Inactive,
    Active,
}

impl HardForkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardForkState::Inactive => "INACTIVE",
            HardForkState::Active => "ACTIVE",
        }
    }
}

// Flag day on median-time-past rather than the tip's own timestamp: a single
// miner cannot drag the median across the threshold.
pub fn is_hard_fork_active(tip: &ChainTipSnapshot, threshold: u64) -> bool {
    tip.median_time_past >= threshold
}

pub fn hard_fork_state(tip: &ChainTipSnapshot, threshold: u64) -> HardForkState {
    if is_hard_fork_active(tip, threshold) {
        HardForkState::Active
    } else {
        HardForkState::Inactive
    }
}
