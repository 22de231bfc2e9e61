//! Per-block concealment decisions.
//!
//! A block whose six face neighbors all hide what is behind them cannot be
//! seen by an honest client, so its identity can be swapped for a decoy.
//! Border cells of a subchunk are never touched: their neighbors live in
//! another subchunk that may not be loaded.

use crate::world::block::{BlockId, BlockState};
use crate::world::chunk::SubChunk;
use crate::world::position::LocalPos;

/// Size of the rotating decoy set; selection is `scan_index & DECOY_MASK`.
pub const DECOY_COUNT: usize = 8;
pub const DECOY_MASK: usize = DECOY_COUNT - 1;

/// How fully enclosed blocks are rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcealMode {
    /// Every enclosed block, whatever it is, becomes `decoys[index & 7]`.
    Rotating([BlockState; DECOY_COUNT]),
    /// Only enclosed value-bearing blocks are rewritten, all to one decoy.
    Fixed(BlockState),
}

/// Immutable lookup tables driving concealment for one world.
#[derive(Debug, Clone)]
pub struct ConcealmentTable {
    transparent: Box<[bool]>,
    valuable: Box<[bool]>,
    mode: ConcealMode,
}

impl ConcealmentTable {
    /// Ids listed in `transparent` let light through; every other id is
    /// opaque. Ids in `valuable` are the ones worth hiding.
    pub fn new<T, V>(transparent: T, valuable: V, mode: ConcealMode) -> Self
    where
        T: IntoIterator<Item = BlockId>,
        V: IntoIterator<Item = BlockId>,
    {
        Self {
            transparent: flags(transparent),
            valuable: flags(valuable),
            mode,
        }
    }

    pub fn mode(&self) -> &ConcealMode {
        &self.mode
    }

    #[inline]
    pub fn is_opaque(&self, id: BlockId) -> bool {
        !self.transparent.get(id.0 as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_valuable(&self, id: BlockId) -> bool {
        self.valuable.get(id.0 as usize).copied().unwrap_or(false)
    }

    /// True when every neighbor is opaque.
    pub fn is_enclosed(&self, neighbors: &[BlockState; 6]) -> bool {
        neighbors.iter().all(|n| self.is_opaque(n.id))
    }

    /// The decoy for an enclosed cell at `index`, or `None` to keep the
    /// true state.
    pub fn substitute(&self, state: BlockState, index: usize) -> Option<BlockState> {
        match &self.mode {
            ConcealMode::Rotating(decoys) => Some(decoys[index & DECOY_MASK]),
            ConcealMode::Fixed(decoy) if self.is_valuable(state.id) => Some(*decoy),
            ConcealMode::Fixed(_) => None,
        }
    }

    /// The state to put on the wire for the cell at `pos`.
    ///
    /// Neighbors are always read from the unmodified subchunk, so the result
    /// does not depend on the order cells are visited in.
    pub fn decide(&self, section: &SubChunk, pos: LocalPos) -> BlockState {
        let state = section.get(pos);
        if pos.is_border() {
            return state;
        }
        let neighbors = pos.neighbors().map(|n| section.get(n));
        if !self.is_enclosed(&neighbors) {
            return state;
        }
        self.substitute(state, pos.index()).unwrap_or(state)
    }
}

fn flags<I: IntoIterator<Item = BlockId>>(ids: I) -> Box<[bool]> {
    let ids: Vec<BlockId> = ids.into_iter().collect();
    let len = ids.iter().map(|id| id.0 as usize + 1).max().unwrap_or(0);
    let mut table = vec![false; len];
    for id in ids {
        table[id.0 as usize] = true;
    }
    table.into_boxed_slice()
}
