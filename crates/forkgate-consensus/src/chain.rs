use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::block::BlockHeader;
use crate::constants::{MEDIAN_TIME_SPAN, VERSIONBITS_TOP_BITS, VERSIONBITS_TOP_MASK};
use crate::error::EngineError;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub const ZERO: BlockHash = BlockHash([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        let b = hex::decode(s.trim()).map_err(|e| format!("block hash: {e}"))?;
        let arr: [u8; 32] = b
            .try_into()
            .map_err(|_| "block hash: expected 32 bytes".to_string())?;
        Ok(BlockHash(arr))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({self})")
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        BlockHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Immutable view of one block on some chain, captured when the block joined
/// the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTipSnapshot {
    pub height: u64,
    pub hash: BlockHash,
    pub parent: Option<BlockHash>,
    pub time: u64,
    /// Median of the timestamps of this block and its ten predecessors (fewer
    /// near genesis).
    pub median_time_past: u64,
    pub version: u32,
}

impl ChainTipSnapshot {
    pub fn uses_version_bits(&self) -> bool {
        self.version & VERSIONBITS_TOP_MASK == VERSIONBITS_TOP_BITS
    }

    pub fn signals(&self, bit: u8) -> bool {
        self.uses_version_bits() && (self.version >> bit) & 1 == 1
    }
}

/// Read access to committed chain history.
pub trait ChainView {
    fn get(&self, hash: &BlockHash) -> Option<&ChainTipSnapshot>;

    fn best_chain_tip(&self) -> Option<&ChainTipSnapshot>;

    /// Ancestor of `tip` at `height` (or `tip` itself). None when `height` is
    /// above the tip or the history is broken.
    fn ancestor<'a>(&'a self, tip: &'a ChainTipSnapshot, height: u64) -> Option<&'a ChainTipSnapshot> {
        if height > tip.height {
            return None;
        }
        let mut cur = tip;
        while cur.height > height {
            cur = self.get(cur.parent.as_ref()?)?;
        }
        Some(cur)
    }
}

pub(crate) fn require_ancestor<'a, V: ChainView + ?Sized>(
    view: &'a V,
    tip: &'a ChainTipSnapshot,
    height: u64,
) -> Result<&'a ChainTipSnapshot, EngineError> {
    view.ancestor(tip, height)
        .ok_or(EngineError::MissingAncestor {
            tip: tip.hash,
            height,
        })
}

pub fn median_time_past(timestamps: &[u64]) -> u64 {
    if timestamps.is_empty() {
        return 0;
    }
    let mut window = timestamps.to_vec();
    window.sort_unstable();
    window[window.len() / 2]
}

/// In-memory block index: every accepted header, side branches included, plus
/// the height-indexed best chain.
#[derive(Clone, Debug, Default)]
pub struct BlockIndex {
    entries: HashMap<BlockHash, ChainTipSnapshot>,
    best_chain: Vec<BlockHash>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best_height(&self) -> Option<u64> {
        self.best_chain.len().checked_sub(1).map(|h| h as u64)
    }

    /// Adds a header whose parent is already indexed. A header with a zero
    /// parent hash is accepted only as genesis of an empty index. Inserting a
    /// known header returns the existing snapshot; a hash hit whose fields
    /// disagree with the stored entry is rejected.
    pub fn insert(&mut self, header: &BlockHeader) -> Result<ChainTipSnapshot, EngineError> {
        let hash = header.hash();
        if let Some(existing) = self.entries.get(&hash) {
            let same = existing.time == u64::from(header.time)
                && existing.version == header.version
                && existing.parent.unwrap_or(BlockHash::ZERO) == header.prev_block_hash;
            if !same {
                return Err(EngineError::HeaderMismatch(hash));
            }
            return Ok(existing.clone());
        }

        let (height, parent) = if header.prev_block_hash == BlockHash::ZERO && self.entries.is_empty() {
            (0, None)
        } else {
            let p = self
                .entries
                .get(&header.prev_block_hash)
                .ok_or(EngineError::UnknownBlock(header.prev_block_hash))?;
            (p.height + 1, Some(p.hash))
        };

        let mut times = Vec::with_capacity(MEDIAN_TIME_SPAN);
        times.push(u64::from(header.time));
        let mut cursor = parent;
        while times.len() < MEDIAN_TIME_SPAN {
            let Some(h) = cursor else { break };
            let Some(p) = self.entries.get(&h) else {
                return Err(EngineError::UnknownBlock(h));
            };
            times.push(p.time);
            cursor = p.parent;
        }

        let snap = ChainTipSnapshot {
            height,
            hash,
            parent,
            time: u64::from(header.time),
            median_time_past: median_time_past(&times),
            version: header.version,
        };
        self.entries.insert(hash, snap.clone());
        Ok(snap)
    }

    /// Inserts the header and makes it the best tip.
    pub fn connect(&mut self, header: &BlockHeader) -> Result<ChainTipSnapshot, EngineError> {
        let snap = self.insert(header)?;
        self.set_best_tip(&snap.hash)?;
        Ok(snap)
    }

    /// Switches the best chain to end at `hash`. Only the suffix that differs
    /// from the current best chain is rewritten.
    pub fn set_best_tip(&mut self, hash: &BlockHash) -> Result<(), EngineError> {
        let tip = self
            .entries
            .get(hash)
            .ok_or(EngineError::UnknownBlock(*hash))?;

        let mut suffix = Vec::new();
        let mut cur = Some(tip);
        while let Some(b) = cur {
            if self.best_chain.get(b.height as usize) == Some(&b.hash) {
                break;
            }
            suffix.push(b.hash);
            cur = match b.parent {
                Some(p) => Some(self.entries.get(&p).ok_or(EngineError::UnknownBlock(p))?),
                None => None,
            };
        }

        let fork_height = tip.height + 1 - suffix.len() as u64;
        if fork_height < self.best_chain.len() as u64 && !suffix.is_empty() {
            debug!(
                old_tip = self.best_height(),
                new_tip = tip.height,
                fork_height,
                "best chain reorganized"
            );
        }
        self.best_chain.truncate(fork_height as usize);
        self.best_chain.extend(suffix.into_iter().rev());
        Ok(())
    }

    fn on_best_chain(&self, snap: &ChainTipSnapshot) -> bool {
        self.best_chain.get(snap.height as usize) == Some(&snap.hash)
    }
}

impl ChainView for BlockIndex {
    fn get(&self, hash: &BlockHash) -> Option<&ChainTipSnapshot> {
        self.entries.get(hash)
    }

    fn best_chain_tip(&self) -> Option<&ChainTipSnapshot> {
        self.best_chain.last().and_then(|h| self.entries.get(h))
    }

    fn ancestor<'a>(&'a self, tip: &'a ChainTipSnapshot, height: u64) -> Option<&'a ChainTipSnapshot> {
        if height > tip.height {
            return None;
        }
        let mut cur = tip;
        loop {
            if self.on_best_chain(cur) {
                let h = self.best_chain.get(height as usize)?;
                return self.entries.get(h);
            }
            if cur.height == height {
                return Some(cur);
            }
            cur = self.entries.get(cur.parent.as_ref()?)?;
        }
    }
}
