pub const WITNESS_SCALE_FACTOR: u64 = 4;

// Pre-fork (1x) block limits. The doubled regime multiplies each by
// LIMIT_MULTIPLIER_2X.
pub const MAX_BLOCK1_BASE_SIZE: u64 = 1_000_000;
pub const MAX_BLOCK1_WEIGHT: u64 = 4_000_000;
pub const MAX_BLOCK1_SIGOPS_COST: u64 = 80_000;
/// Buffer bound for a fully serialized (witness-included) block.
pub const MAX_BLOCK1_SERIALIZED_SIZE: u64 = 4_000_000;

pub const LIMIT_MULTIPLIER_1X: u64 = 1;
pub const LIMIT_MULTIPLIER_2X: u64 = 2;

/// Does not change when the block limits double.
pub const MAX_TRANSACTION_BASE_SIZE: u64 = 1_000_000;

pub const COINBASE_MATURITY: u64 = 100;

pub const MEDIAN_TIME_SPAN: usize = 11;

pub const VERSIONBITS_TOP_BITS: u32 = 0x2000_0000;
pub const VERSIONBITS_TOP_MASK: u32 = 0xE000_0000;
pub const VERSIONBITS_NUM_BITS: u8 = 29;

pub const NO_TIMEOUT: u64 = u64::MAX;

pub const BLOCK_HEADER_BYTES: u64 = 80;

// Script opcodes relevant to sigop counting.
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

pub const MAX_PUBKEYS_PER_MULTISIG: u64 = 20;
