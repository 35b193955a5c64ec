use serde::Serialize;

use crate::block::{Block, Transaction};
use crate::compactsize::compact_size_len;
use crate::constants::{BLOCK_HEADER_BYTES, WITNESS_SCALE_FACTOR};
use crate::error::SizeViolation;
use crate::limits::EffectiveLimits;
use crate::sigops::count_legacy_sigops;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TxMeasure {
    pub base_size: u64,
    pub total_size: u64,
    pub legacy_sigops: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BlockMeasure {
    /// Serialized size with witness data stripped.
    pub base_size: u64,
    /// Serialized size including witness data.
    pub total_size: u64,
    pub weight: u64,
    pub sigop_cost: u64,
    pub tx_base_sizes: Vec<u64>,
}

fn witness_stack_size(stack: &[Vec<u8>]) -> u64 {
    stack.iter().fold(compact_size_len(stack.len() as u64), |acc, item| {
        acc + compact_size_len(item.len() as u64) + item.len() as u64
    })
}

pub fn measure_tx(tx: &Transaction) -> TxMeasure {
    // version + locktime
    let mut base: u64 = 4 + 4;
    let mut sigops: u64 = 0;

    base += compact_size_len(tx.inputs.len() as u64);
    for i in &tx.inputs {
        let script_len = i.script_sig.len() as u64;
        base += 32 + 4 + compact_size_len(script_len) + script_len + 4;
        sigops += count_legacy_sigops(&i.script_sig);
    }
    base += compact_size_len(tx.outputs.len() as u64);
    for o in &tx.outputs {
        let script_len = o.script_pubkey.len() as u64;
        base += 8 + compact_size_len(script_len) + script_len;
        sigops += count_legacy_sigops(&o.script_pubkey);
    }

    let mut total = base;
    if tx.has_witness() {
        // marker + flag
        total += 2;
        total += tx
            .inputs
            .iter()
            .map(|i| witness_stack_size(&i.witness))
            .sum::<u64>();
    }

    TxMeasure {
        base_size: base,
        total_size: total,
        legacy_sigops: sigops,
    }
}

pub fn measure_block(block: &Block) -> BlockMeasure {
    let prefix = BLOCK_HEADER_BYTES + compact_size_len(block.txs.len() as u64);
    let mut m = BlockMeasure {
        base_size: prefix,
        total_size: prefix,
        tx_base_sizes: Vec::with_capacity(block.txs.len()),
        ..BlockMeasure::default()
    };
    let mut legacy_sigops: u64 = 0;
    for tx in &block.txs {
        let t = measure_tx(tx);
        m.base_size += t.base_size;
        m.total_size += t.total_size;
        legacy_sigops += t.legacy_sigops;
        m.tx_base_sizes.push(t.base_size);
    }
    // base counts once per scale unit, witness bytes once
    m.weight = m.base_size * (WITNESS_SCALE_FACTOR - 1) + m.total_size;
    m.sigop_cost = legacy_sigops * WITNESS_SCALE_FACTOR;
    m
}

/// Every limit a measured block breaks, in check order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SizeReport {
    pub violations: Vec<SizeViolation>,
}

impl SizeReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first(&self) -> Option<SizeViolation> {
        self.violations.first().copied()
    }

    pub fn into_result(self) -> Result<(), SizeViolation> {
        match self.first() {
            Some(v) => Err(v),
            None => Ok(()),
        }
    }
}

/// Applies every limit; limits are inclusive. The per-transaction cap does not
/// scale with the block limits.
pub fn check_size(m: &BlockMeasure, limits: &EffectiveLimits, max_tx_base_size: u64) -> SizeReport {
    let mut violations = Vec::new();
    if m.base_size > limits.max_base_size {
        violations.push(SizeViolation::BaseSizeExceeded {
            actual: m.base_size,
            limit: limits.max_base_size,
        });
    }
    if m.weight > limits.max_weight {
        violations.push(SizeViolation::WeightExceeded {
            actual: m.weight,
            limit: limits.max_weight,
        });
    }
    if m.sigop_cost > limits.max_sigop_cost {
        violations.push(SizeViolation::SigopsExceeded {
            actual: m.sigop_cost,
            limit: limits.max_sigop_cost,
        });
    }
    for (index, &size) in m.tx_base_sizes.iter().enumerate() {
        if size > max_tx_base_size {
            violations.push(SizeViolation::TransactionBaseSizeExceeded {
                index,
                actual: size,
                limit: max_tx_base_size,
            });
        }
    }
    SizeReport { violations }
}
