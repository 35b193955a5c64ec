#![no_main]

use forkgate_consensus::{
    BlockHash, BlockHeader, BlockIndex, BlockSizeEngine, ConsensusParams, DeploymentId,
    DeploymentParams, ForkState,
};
use libfuzzer_sys::fuzz_target;

// Each input byte is one block: bit 0 signals, the high bits are the time
// step. States along the chain must never move backwards and the engine must
// resolve every tip of a well-formed chain.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 || data.len() > 512 {
        return;
    }
    let timeout = 1_000 + u64::from(data[0]) * 40;
    let params = ConsensusParams {
        network: "fuzz".to_string(),
        base_size_1x: 1_000,
        weight_1x: 4_000,
        sigop_cost_1x: 80,
        serialized_size_1x: 4_000,
        max_tx_base_size: 1_000,
        hard_fork_threshold: u64::MAX,
        deployments: vec![DeploymentParams {
            id: DeploymentId::SegwitAndLargerBlocks,
            bit: 0,
            start_time: 1_000,
            timeout,
            window: 4,
            threshold: 3,
        }],
    };
    let engine = match BlockSizeEngine::new(params) {
        Ok(e) => e,
        Err(_) => return,
    };

    let mut index = BlockIndex::new();
    let mut prev = BlockHash::ZERO;
    let mut time = 900u32;
    let mut last = ForkState::Defined;
    for (i, b) in data[1..].iter().enumerate() {
        time += u32::from(b >> 1);
        let snap = index
            .connect(&BlockHeader {
                version: 0x2000_0000 | u32::from(b & 1),
                prev_block_hash: prev,
                merkle_root: [0u8; 32],
                time,
                bits: 0,
                nonce: i as u32,
            })
            .expect("linear chain connects");
        prev = snap.hash;

        let state = engine
            .get_state(&index, DeploymentId::SegwitAndLargerBlocks, &snap)
            .expect("state on well-formed chain");
        assert!(state >= last, "{state:?} after {last:?}");
        last = state;

        let limits = engine.resolve_limits(&index, &snap).expect("limits");
        let doubled = state == ForkState::Active;
        assert_eq!(limits.max_base_size, if doubled { 2_000 } else { 1_000 });
    }
});
