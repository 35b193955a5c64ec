use sha3::{Digest, Sha3_256};

use crate::chain::BlockHash;

/// Block identity commits to the 80-byte header only.
pub(crate) fn header_hash(header: &[u8; 80]) -> BlockHash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha3_256::digest(header));
    BlockHash(out)
}
