use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::chain::{require_ancestor, BlockHash, ChainTipSnapshot, ChainView};
use crate::deployment::{DeploymentId, DeploymentParams};
use crate::error::EngineError;

/// Activation state of a version-bits deployment for one retarget period.
///
/// Ordering follows the lifecycle: a deployment only ever moves to a greater
/// state on the same chain, except that `Failed` is a sink entered from
/// `Defined` or `Started`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForkState {
    Defined,
    Started,
    LockedIn,
    Active,
    Failed,
}

impl ForkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForkState::Defined => "DEFINED",
            ForkState::Started => "STARTED",
            ForkState::LockedIn => "LOCKED_IN",
            ForkState::Active => "ACTIVE",
            ForkState::Failed => "FAILED",
        }
    }
}

/// Two registrations sharing an id but differing in bit, window or schedule
/// are distinct keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PeriodKey {
    deployment: DeploymentParams,
    period_start: u64,
    /// Last block of the previous period. Keying on its hash keeps states
    /// computed for abandoned branches out of reach of the best chain.
    defining: BlockHash,
}

impl PeriodKey {
    fn new(deployment: &DeploymentParams, defining: &ChainTipSnapshot) -> Self {
        Self {
            deployment: deployment.clone(),
            period_start: defining.height + 1,
            defining: defining.hash,
        }
    }
}

/// Memo of settled per-period states. Settled entries never change, so a
/// reader only ever takes the shared lock and writers only insert.
#[derive(Debug, Default)]
pub struct ForkStateCache {
    settled: RwLock<HashMap<PeriodKey, ForkState>>,
}

impl ForkStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.settled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.settled.read().is_empty()
    }

    /// Drops every entry for periods starting below `height`. Safe at any
    /// time: dropped periods are recomputed on demand.
    pub fn prune_below(&self, height: u64) {
        self.settled.write().retain(|k, _| k.period_start >= height);
    }

    pub fn clear(&self) {
        self.settled.write().clear();
    }

    fn lookup(&self, key: &PeriodKey) -> Option<ForkState> {
        self.settled.read().get(key).copied()
    }

    fn settle(&self, entries: Vec<(PeriodKey, ForkState)>) {
        if entries.is_empty() {
            return;
        }
        let mut settled = self.settled.write();
        for (k, s) in entries {
            settled.insert(k, s);
        }
    }

    /// State that applies to the block built on top of `tip`.
    pub fn get_state<V: ChainView + ?Sized>(
        &self,
        view: &V,
        d: &DeploymentParams,
        tip: &ChainTipSnapshot,
    ) -> Result<ForkState, EngineError> {
        let window = u64::from(d.window);

        // Walk back one period at a time until the state is known.
        let mut pending: Vec<&ChainTipSnapshot> = Vec::new();
        let mut found: Vec<(PeriodKey, ForkState)> = Vec::new();
        let mut state = ForkState::Defined;
        let mut cursor = period_defining_block(view, tip, window)?;
        while let Some(block) = cursor {
            let key = PeriodKey::new(d, block);
            if let Some(s) = self.lookup(&key) {
                state = s;
                break;
            }
            // MTP never decreases along a chain, so every earlier boundary
            // is also before start_time.
            if block.median_time_past < d.start_time {
                found.push((key, ForkState::Defined));
                break;
            }
            pending.push(block);
            cursor = if block.height >= window {
                Some(require_ancestor(view, block, block.height - window)?)
            } else {
                None
            };
        }

        for block in pending.into_iter().rev() {
            let count = if state == ForkState::Started {
                count_signals(view, block, d, d.window)?
            } else {
                0
            };
            let next = next_state(state, block.median_time_past, count, d);
            if next != state {
                debug!(
                    deployment = %d.id,
                    period_start = block.height + 1,
                    from = state.as_str(),
                    to = next.as_str(),
                    signals = count,
                    "deployment state transition"
                );
            }
            state = next;
            found.push((PeriodKey::new(d, block), state));
        }

        self.settle(found);
        Ok(state)
    }

    /// Full status report for the period containing the block after `tip`.
    pub fn deployment_status<V: ChainView + ?Sized>(
        &self,
        view: &V,
        d: &DeploymentParams,
        tip: &ChainTipSnapshot,
    ) -> Result<DeploymentStatus, EngineError> {
        let window = u64::from(d.window);
        let state = self.get_state(view, d, tip)?;
        let next_height = tip.height + 1;
        let period_start = next_height - next_height % window;

        let mut since_height = 0;
        if state != ForkState::Defined {
            if let Some(mut defining) = period_defining_block(view, tip, window)? {
                while defining.height >= window {
                    let prev = require_ancestor(view, defining, defining.height - window)?;
                    if self.get_state(view, d, prev)? != state {
                        break;
                    }
                    defining = prev;
                }
                since_height = defining.height + 1;
            }
        }

        let stats = if state == ForkState::Started {
            let elapsed = (next_height % window) as u32;
            let count = count_signals(view, tip, d, elapsed)?;
            Some(SignalStats {
                period: d.window,
                threshold: d.threshold,
                elapsed,
                count,
                possible: d.window - d.threshold >= elapsed - count,
            })
        } else {
            None
        };

        Ok(DeploymentStatus {
            id: d.id,
            bit: d.bit,
            state,
            since_height,
            period_start,
            stats,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SignalStats {
    pub period: u32,
    pub threshold: u32,
    /// Blocks of the current period already on chain.
    pub elapsed: u32,
    pub count: u32,
    /// Whether the threshold can still be reached this period.
    pub possible: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DeploymentStatus {
    pub id: DeploymentId,
    pub bit: u8,
    pub state: ForkState,
    pub since_height: u64,
    pub period_start: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SignalStats>,
}

fn period_defining_block<'a, V: ChainView + ?Sized>(
    view: &'a V,
    tip: &'a ChainTipSnapshot,
    window: u64,
) -> Result<Option<&'a ChainTipSnapshot>, EngineError> {
    let next_height = tip.height + 1;
    let period_start = next_height - next_height % window;
    if period_start == 0 {
        return Ok(None);
    }
    require_ancestor(view, tip, period_start - 1).map(Some)
}

/// Counts signalling blocks among the `n` blocks ending at `last`.
pub(crate) fn count_signals<V: ChainView + ?Sized>(
    view: &V,
    last: &ChainTipSnapshot,
    d: &DeploymentParams,
    n: u32,
) -> Result<u32, EngineError> {
    let mut count = 0;
    let mut cur = last;
    for i in 0..n {
        if cur.signals(d.bit) {
            count += 1;
        }
        if i + 1 == n {
            break;
        }
        cur = cur
            .parent
            .as_ref()
            .and_then(|h| view.get(h))
            .ok_or(EngineError::MissingAncestor {
                tip: last.hash,
                height: cur.height.saturating_sub(1),
            })?;
    }
    Ok(count)
}

pub(crate) fn next_state(
    prev: ForkState,
    reference_time: u64,
    signal_count: u32,
    d: &DeploymentParams,
) -> ForkState {
    match prev {
        ForkState::Defined => {
            if reference_time >= d.timeout {
                ForkState::Failed
            } else if reference_time >= d.start_time {
                ForkState::Started
            } else {
                ForkState::Defined
            }
        }
        ForkState::Started => {
            if signal_count >= d.threshold {
                ForkState::LockedIn
            } else if reference_time >= d.timeout {
                ForkState::Failed
            } else {
                ForkState::Started
            }
        }
        ForkState::LockedIn => ForkState::Active,
        ForkState::Active => ForkState::Active,
        ForkState::Failed => ForkState::Failed,
    }
}
