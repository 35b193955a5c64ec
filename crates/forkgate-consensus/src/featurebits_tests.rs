use std::cell::Cell;

use crate::block::BlockHeader;
use crate::chain::{BlockHash, BlockIndex, ChainTipSnapshot, ChainView};
use crate::deployment::{DeploymentId, DeploymentParams};
use crate::featurebits::{next_state, ForkState, ForkStateCache};

const SIG: u32 = 0x2000_0002;
const NOSIG: u32 = 0x2000_0000;

fn dep(start_time: u64, timeout: u64) -> DeploymentParams {
    DeploymentParams {
        id: DeploymentId::TestDummy,
        bit: 1,
        start_time,
        timeout,
        window: 4,
        threshold: 3,
    }
}

fn extend(
    index: &mut BlockIndex,
    from: Option<&ChainTipSnapshot>,
    versions: &[u32],
    nonce: u32,
) -> Vec<ChainTipSnapshot> {
    let mut out = Vec::new();
    let mut prev = from.map(|s| s.hash).unwrap_or(BlockHash::ZERO);
    let mut height = from.map(|s| s.height + 1).unwrap_or(0);
    for v in versions {
        let snap = index
            .connect(&BlockHeader {
                version: *v,
                prev_block_hash: prev,
                merkle_root: [0u8; 32],
                time: 1000 + 10 * height as u32,
                bits: 0,
                nonce,
            })
            .expect("connect");
        prev = snap.hash;
        height += 1;
        out.push(snap);
    }
    out
}

fn chain(versions: &[u32]) -> (BlockIndex, Vec<ChainTipSnapshot>) {
    let mut index = BlockIndex::new();
    let blocks = extend(&mut index, None, versions, 0);
    (index, blocks)
}

struct CountingView<'a> {
    inner: &'a BlockIndex,
    reads: Cell<usize>,
}

impl ChainView for CountingView<'_> {
    fn get(&self, hash: &BlockHash) -> Option<&ChainTipSnapshot> {
        self.reads.set(self.reads.get() + 1);
        self.inner.get(hash)
    }

    fn best_chain_tip(&self) -> Option<&ChainTipSnapshot> {
        self.inner.best_chain_tip()
    }

    fn ancestor<'a>(
        &'a self,
        tip: &'a ChainTipSnapshot,
        height: u64,
    ) -> Option<&'a ChainTipSnapshot> {
        self.reads.set(self.reads.get() + 1);
        self.inner.ancestor(tip, height)
    }
}

#[test]
fn featurebits_single_step_no_double_transition() {
    let d = dep(0, 100_000);
    assert_eq!(next_state(ForkState::Defined, 0, 4, &d), ForkState::Started);
    assert_eq!(next_state(ForkState::Started, 0, 4, &d), ForkState::LockedIn);
    assert_eq!(next_state(ForkState::LockedIn, 0, 0, &d), ForkState::Active);
    assert_eq!(next_state(ForkState::Active, u64::MAX, 0, &d), ForkState::Active);
    assert_eq!(next_state(ForkState::Failed, 0, 4, &d), ForkState::Failed);
}

#[test]
fn featurebits_genesis_period_is_defined() {
    let (index, b) = chain(&[SIG; 4]);
    let cache = ForkStateCache::new();
    let d = dep(0, 100_000);
    for tip in &b[..3] {
        assert_eq!(cache.get_state(&index, &d, tip).unwrap(), ForkState::Defined);
    }
    // Signalling during the genesis period is ignored: entering STARTED is
    // the only step at the first boundary.
    assert_eq!(cache.get_state(&index, &d, &b[3]).unwrap(), ForkState::Started);
}

#[test]
fn featurebits_full_lifecycle_to_active() {
    let (index, b) = chain(&[SIG; 16]);
    let cache = ForkStateCache::new();
    let d = dep(0, 100_000);

    assert_eq!(cache.get_state(&index, &d, &b[3]).unwrap(), ForkState::Started);
    assert_eq!(cache.get_state(&index, &d, &b[6]).unwrap(), ForkState::Started);
    assert_eq!(cache.get_state(&index, &d, &b[7]).unwrap(), ForkState::LockedIn);
    assert_eq!(cache.get_state(&index, &d, &b[9]).unwrap(), ForkState::LockedIn);
    assert_eq!(cache.get_state(&index, &d, &b[11]).unwrap(), ForkState::Active);
    assert_eq!(cache.get_state(&index, &d, &b[15]).unwrap(), ForkState::Active);
}

#[test]
fn featurebits_threshold_is_inclusive() {
    let mut versions = vec![NOSIG; 12];
    versions[4..7].copy_from_slice(&[SIG, SIG, SIG]);
    let (index, b) = chain(&versions);
    let cache = ForkStateCache::new();
    assert_eq!(
        cache.get_state(&index, &dep(0, 100_000), &b[7]).unwrap(),
        ForkState::LockedIn
    );

    let mut versions = vec![NOSIG; 12];
    versions[4..6].copy_from_slice(&[SIG, SIG]);
    let (index, b) = chain(&versions);
    assert_eq!(
        ForkStateCache::new()
            .get_state(&index, &dep(0, 100_000), &b[7])
            .unwrap(),
        ForkState::Started
    );
}

#[test]
fn featurebits_bit_without_top_bits_does_not_count() {
    let mut versions = vec![NOSIG; 8];
    for v in &mut versions[4..8] {
        *v = 0x0000_0002;
    }
    let (index, b) = chain(&versions);
    assert_eq!(
        ForkStateCache::new()
            .get_state(&index, &dep(0, 100_000), &b[7])
            .unwrap(),
        ForkState::Started
    );
}

#[test]
fn featurebits_lockin_wins_over_timeout() {
    // MTP of height 7 is the time of height 4 (1040).
    let (index, b) = chain(&[SIG; 8]);
    assert_eq!(b[7].median_time_past, 1040);
    let d = dep(0, 1040);
    assert_eq!(
        ForkStateCache::new().get_state(&index, &d, &b[7]).unwrap(),
        ForkState::LockedIn
    );
}

#[test]
fn featurebits_timeout_to_failed() {
    let mut versions = vec![NOSIG; 8];
    versions.extend_from_slice(&[SIG; 8]);
    let (index, b) = chain(&versions);
    let cache = ForkStateCache::new();
    let d = dep(0, 1040);
    assert_eq!(cache.get_state(&index, &d, &b[3]).unwrap(), ForkState::Started);
    assert_eq!(cache.get_state(&index, &d, &b[7]).unwrap(), ForkState::Failed);
    // Late signalling cannot revive a failed deployment.
    assert_eq!(cache.get_state(&index, &d, &b[15]).unwrap(), ForkState::Failed);
}

#[test]
fn featurebits_defined_straight_to_failed() {
    // First boundary MTP is 1020: already past both start and timeout.
    let (index, b) = chain(&[SIG; 8]);
    let d = dep(1015, 1020);
    assert_eq!(
        ForkStateCache::new().get_state(&index, &d, &b[3]).unwrap(),
        ForkState::Failed
    );
}

#[test]
fn featurebits_waits_for_start_time() {
    let (index, b) = chain(&[SIG; 12]);
    // boundary MTPs: h3 -> 1020, h7 -> 1040, h11 -> 1060
    let d = dep(1040, 100_000);
    let cache = ForkStateCache::new();
    assert_eq!(cache.get_state(&index, &d, &b[3]).unwrap(), ForkState::Defined);
    assert_eq!(cache.get_state(&index, &d, &b[7]).unwrap(), ForkState::Started);
    assert_eq!(cache.get_state(&index, &d, &b[11]).unwrap(), ForkState::LockedIn);
}

#[test]
fn featurebits_settled_periods_are_cache_hits() {
    let (index, b) = chain(&[SIG; 12]);
    let d = dep(0, 100_000);
    let cache = ForkStateCache::new();
    let view = CountingView {
        inner: &index,
        reads: Cell::new(0),
    };

    assert_eq!(cache.get_state(&view, &d, &b[11]).unwrap(), ForkState::Active);
    let cold = view.reads.replace(0);
    let entries = cache.len();
    assert_eq!(entries, 3);

    assert_eq!(cache.get_state(&view, &d, &b[11]).unwrap(), ForkState::Active);
    assert_eq!(view.reads.get(), 1, "only the defining block lookup");
    assert!(cold > 1);
    assert_eq!(cache.len(), entries);

    cache.prune_below(8);
    assert_eq!(cache.len(), 2);
    cache.prune_below(12);
    assert_eq!(cache.len(), 1);
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.get_state(&index, &d, &b[11]).unwrap(), ForkState::Active);
}

#[test]
fn featurebits_branches_do_not_share_cache_entries() {
    let mut index = BlockIndex::new();
    let common = extend(&mut index, None, &[NOSIG; 8], 0);
    let a = extend(&mut index, common.last(), &[SIG; 4], 1);
    let b = extend(&mut index, common.last(), &[NOSIG; 4], 2);
    let d = dep(0, 100_000);
    let cache = ForkStateCache::new();

    assert_eq!(cache.get_state(&index, &d, &a[3]).unwrap(), ForkState::LockedIn);
    assert_eq!(cache.get_state(&index, &d, &b[3]).unwrap(), ForkState::Started);

    index.set_best_tip(&a[3].hash).unwrap();
    assert_eq!(cache.get_state(&index, &d, &a[3]).unwrap(), ForkState::LockedIn);
    assert_eq!(cache.get_state(&index, &d, &b[3]).unwrap(), ForkState::Started);
    // common prefix
    assert_eq!(cache.get_state(&index, &d, &common[7]).unwrap(), ForkState::Started);
}

#[test]
fn featurebits_same_id_with_other_params_gets_own_entries() {
    let (index, b) = chain(&[SIG; 12]);
    let on_bit_one = dep(0, 100_000);
    let on_bit_five = DeploymentParams {
        bit: 5,
        ..dep(0, 100_000)
    };
    let shared = ForkStateCache::new();

    assert_eq!(shared.get_state(&index, &on_bit_one, &b[11]).unwrap(), ForkState::Active);
    let entries = shared.len();
    for tip in [&b[7], &b[11]] {
        assert_eq!(
            shared.get_state(&index, &on_bit_five, tip).unwrap(),
            ForkStateCache::new().get_state(&index, &on_bit_five, tip).unwrap()
        );
    }
    assert_eq!(shared.get_state(&index, &on_bit_five, &b[11]).unwrap(), ForkState::Started);
    assert!(shared.len() > entries);
    assert_eq!(shared.get_state(&index, &on_bit_one, &b[7]).unwrap(), ForkState::LockedIn);
}

#[test]
fn featurebits_status_reports_since_and_stats() {
    let mut versions = vec![NOSIG; 4];
    versions.extend_from_slice(&[SIG; 12]);
    let (index, b) = chain(&versions);
    let d = dep(0, 100_000);
    let cache = ForkStateCache::new();

    let st = cache.deployment_status(&index, &d, &b[5]).unwrap();
    assert_eq!(st.state, ForkState::Started);
    assert_eq!(st.since_height, 4);
    assert_eq!(st.period_start, 4);
    let stats = st.stats.expect("stats while started");
    assert_eq!((stats.elapsed, stats.count, stats.possible), (2, 2, true));

    let st = cache.deployment_status(&index, &d, &b[9]).unwrap();
    assert_eq!((st.state, st.since_height, st.period_start), (ForkState::LockedIn, 8, 8));
    assert!(st.stats.is_none());

    let st = cache.deployment_status(&index, &d, &b[15]).unwrap();
    assert_eq!((st.state, st.since_height), (ForkState::Active, 12));

    let st = cache.deployment_status(&index, &d, &b[1]).unwrap();
    assert_eq!((st.state, st.since_height), (ForkState::Defined, 0));
}

#[test]
fn featurebits_status_flags_impossible_lockin() {
    let (index, b) = chain(&[NOSIG; 8]);
    let st = ForkStateCache::new()
        .deployment_status(&index, &dep(0, 100_000), &b[5])
        .unwrap();
    let stats = st.stats.unwrap();
    // two misses with a slack of one
    assert_eq!((stats.elapsed, stats.count, stats.possible), (2, 0, false));
}

#[test]
fn featurebits_broken_view_is_an_error() {
    let (index, b) = chain(&[SIG; 8]);
    let mut orphan = b[7].clone();
    orphan.parent = Some(BlockHash([0xee; 32]));
    orphan.hash = BlockHash([0xdd; 32]);
    let err = ForkStateCache::new()
        .get_state(&index, &dep(0, 100_000), &orphan)
        .unwrap_err();
    assert!(err.to_string().contains("missing ancestor"));
}
