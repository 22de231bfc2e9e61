//! Block state to runtime id mapping.

use std::collections::HashMap;

use crate::world::block::{BlockId, BlockState, RuntimeId};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no runtime id for block state {0:?}")]
    UnknownState(BlockState),
    #[error("runtime table has no entry for air")]
    MissingAir,
}

/// Maps block states to the dense ids used on the wire.
pub trait BlockRegistry {
    fn runtime_id(&self, state: BlockState) -> Result<RuntimeId, RegistryError>;

    /// Runtime id of plain air. Every palette starts with it.
    fn air(&self) -> RuntimeId;
}

/// Registry backed by an ordered state list: runtime id = list position.
#[derive(Debug, Clone)]
pub struct RuntimeTable {
    ids: HashMap<BlockState, RuntimeId>,
    air: RuntimeId,
}

impl RuntimeTable {
    pub fn from_states<I>(states: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = BlockState>,
    {
        let mut ids = HashMap::new();
        for (i, state) in states.into_iter().enumerate() {
            ids.entry(state).or_insert(RuntimeId(i as u32));
        }
        let air = *ids.get(&BlockState::AIR).ok_or(RegistryError::MissingAir)?;
        Ok(Self { ids, air })
    }

    /// Every `(id, aux)` with `id < block_count` and `aux < variants`, in
    /// id-major order.
    pub fn sequential(block_count: u16, variants: u16) -> Self {
        let ids = (0..block_count)
            .flat_map(|id| (0..variants).map(move |aux| BlockState::of(BlockId(id), aux)))
            .enumerate()
            .map(|(i, state)| (state, RuntimeId(i as u32)))
            .collect();
        Self { ids, air: RuntimeId(0) }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl BlockRegistry for RuntimeTable {
    fn runtime_id(&self, state: BlockState) -> Result<RuntimeId, RegistryError> {
        self.ids
            .get(&state)
            .copied()
            .ok_or(RegistryError::UnknownState(state))
    }

    fn air(&self) -> RuntimeId {
        self.air
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_is_dense() {
        let table = RuntimeTable::sequential(4, 16);
        assert_eq!(table.len(), 64);
        assert_eq!(table.air(), RuntimeId(0));
        assert_eq!(table.runtime_id(BlockState::of(BlockId(2), 3)).unwrap(), RuntimeId(35));
        assert!(table.runtime_id(BlockState::plain(BlockId(4))).is_err());
    }

    #[test]
    fn from_states_requires_air() {
        let missing = RuntimeTable::from_states([BlockState::plain(BlockId(1))]);
        assert!(matches!(missing, Err(RegistryError::MissingAir)));

        let table =
            RuntimeTable::from_states([BlockState::plain(BlockId(1)), BlockState::AIR]).unwrap();
        assert_eq!(table.air(), RuntimeId(1));
    }
}
