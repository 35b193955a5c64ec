use serde::{Deserialize, Serialize};

use crate::chain::BlockHash;
use crate::compactsize::encode_compact_size;
use crate::hash::header_hash;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: Option<OutPoint>,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    /// Appends the transaction's wire encoding. Without witness this is the
    /// legacy layout; with witness it adds the marker/flag pair and one stack
    /// per input, but only when some input actually carries witness data.
    pub fn encode(&self, out: &mut Vec<u8>, with_witness: bool) {
        let extended = with_witness && self.has_witness();
        out.extend_from_slice(&self.version.to_le_bytes());
        if extended {
            out.push(0x00);
            out.push(0x01);
        }
        encode_compact_size(self.inputs.len() as u64, out);
        for i in &self.inputs {
            let op = i.prevout.unwrap_or(OutPoint {
                txid: [0u8; 32],
                vout: u32::MAX,
            });
            out.extend_from_slice(&op.txid);
            out.extend_from_slice(&op.vout.to_le_bytes());
            encode_compact_size(i.script_sig.len() as u64, out);
            out.extend_from_slice(&i.script_sig);
            out.extend_from_slice(&i.sequence.to_le_bytes());
        }
        encode_compact_size(self.outputs.len() as u64, out);
        for o in &self.outputs {
            out.extend_from_slice(&o.value.to_le_bytes());
            encode_compact_size(o.script_pubkey.len() as u64, out);
            out.extend_from_slice(&o.script_pubkey);
        }
        if extended {
            for i in &self.inputs {
                encode_compact_size(i.witness.len() as u64, out);
                for item in &i.witness {
                    encode_compact_size(item.len() as u64, out);
                    out.extend_from_slice(item);
                }
            }
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_block_hash: BlockHash,
    pub merkle_root: [u8; 32],
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    /// Fixed 80-byte header layout; every field is committed to by the hash.
    pub fn encode(&self) -> [u8; 80] {
        let mut b = [0u8; 80];
        b[0..4].copy_from_slice(&self.version.to_le_bytes());
        b[4..36].copy_from_slice(self.prev_block_hash.as_bytes());
        b[36..68].copy_from_slice(&self.merkle_root);
        b[68..72].copy_from_slice(&self.time.to_le_bytes());
        b[72..76].copy_from_slice(&self.bits.to_le_bytes());
        b[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        b
    }

    pub fn hash(&self) -> BlockHash {
        header_hash(&self.encode())
    }
}

/// A block offered for connection on top of some parent tip. The validator
/// only borrows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Transaction>,
}

impl Block {
    pub fn encode(&self, with_witness: bool) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.header.encode());
        encode_compact_size(self.txs.len() as u64, &mut out);
        for tx in &self.txs {
            tx.encode(&mut out, with_witness);
        }
        out
    }

    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }
}
