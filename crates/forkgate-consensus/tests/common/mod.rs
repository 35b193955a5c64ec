#![allow(dead_code)]

use forkgate_consensus::{
    compact_size_len, measure_block, Block, BlockHash, BlockHeader, BlockIndex, ChainTipSnapshot,
    Transaction, TxIn, TxOut,
};

pub const NO_SIGNAL: u32 = 0x2000_0000;
/// Signals bit 4, the combined deployment on every preset network.
pub const SIGNAL_COMBINED: u32 = 0x2000_0010;

const PADDING_OPCODE: u8 = 0x5b; // OP_11
const PADDING_TX_TARGET: u64 = 800_000;

pub struct TestChain {
    pub index: BlockIndex,
    pub blocks: Vec<ChainTipSnapshot>,
}

impl TestChain {
    pub fn new() -> Self {
        Self {
            index: BlockIndex::new(),
            blocks: Vec::new(),
        }
    }

    pub fn tip(&self) -> &ChainTipSnapshot {
        self.blocks.last().expect("empty chain")
    }

    pub fn push(&mut self, time: u32, version: u32) -> ChainTipSnapshot {
        let prev = self.blocks.last().map(|b| b.hash).unwrap_or(BlockHash::ZERO);
        let snap = self
            .index
            .connect(&BlockHeader {
                version,
                prev_block_hash: prev,
                merkle_root: [0u8; 32],
                time,
                bits: 0x207f_ffff,
                nonce: self.blocks.len() as u32,
            })
            .expect("connect");
        self.blocks.push(snap.clone());
        snap
    }

    /// Appends enough blocks stamped `time` that the tip's median-time-past
    /// equals `time`.
    pub fn settle_at(&mut self, time: u32, version: u32) {
        for _ in 0..11 {
            self.push(time, version);
        }
        assert_eq!(self.tip().median_time_past, u64::from(time));
    }
}

fn padding_tx(base_size: u64) -> Transaction {
    // version, locktime, one input without script, one empty output
    let fixed = 4 + 4 + 1 + (32 + 4 + 4) + 1 + (8 + 1);
    let script_len = [1u64, 3, 5]
        .into_iter()
        .map(|prefix| base_size - fixed - prefix)
        .find(|&len| fixed + compact_size_len(len) + len == base_size)
        .expect("no script length hits the target size");
    Transaction {
        version: 1,
        inputs: vec![TxIn {
            prevout: None,
            script_sig: vec![PADDING_OPCODE; script_len as usize],
            sequence: u32::MAX,
            witness: vec![],
        }],
        outputs: vec![TxOut {
            value: 0,
            script_pubkey: vec![],
        }],
        lock_time: 0,
    }
}

/// A block on `parent` whose witness-stripped size is exactly `base_size`,
/// spread over padding transactions that each stay well under the
/// per-transaction cap.
pub fn block_of_size(parent: &ChainTipSnapshot, base_size: u64) -> Block {
    let count = base_size.div_ceil(PADDING_TX_TARGET).max(1);
    let prefix = 80 + compact_size_len(count);
    let body = base_size - prefix;
    let share = body / count;

    let mut txs = Vec::with_capacity(count as usize);
    for i in 0..count {
        let size = if i + 1 == count {
            body - share * (count - 1)
        } else {
            share
        };
        txs.push(padding_tx(size));
    }

    let block = Block {
        header: BlockHeader {
            version: NO_SIGNAL,
            prev_block_hash: parent.hash,
            merkle_root: [0u8; 32],
            time: parent.time as u32 + 1,
            bits: 0x207f_ffff,
            nonce: 0,
        },
        txs,
    };
    assert_eq!(measure_block(&block).base_size, base_size);
    block
}
