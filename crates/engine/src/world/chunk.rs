use std::collections::BTreeMap;

use super::block::BlockState;
use super::position::LocalPos;

/// Number of blocks along each axis of a subchunk.
pub const SECTION_SIZE: usize = 16;
/// Total block count in one subchunk.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
/// Subchunks per column (world height 0..256).
pub const SECTION_COUNT: usize = 16;
/// Version byte of the raw legacy subchunk layout.
pub const RAW_SECTION_VERSION: u8 = 0;

/// A 16x16x16 cube of block states.
///
/// Stored flat in XZY order (`x << 8 | z << 4 | y`), the same order the
/// encoder scans and the client expects.
#[derive(Clone, PartialEq, Eq)]
pub struct SubChunk {
    blocks: Box<[BlockState; SECTION_VOLUME]>,
}

impl SubChunk {
    pub fn new_filled(state: BlockState) -> Self {
        Self {
            blocks: Box::new([state; SECTION_VOLUME]),
        }
    }

    pub fn new_empty() -> Self {
        Self::new_filled(BlockState::AIR)
    }

    #[inline]
    pub fn get(&self, pos: LocalPos) -> BlockState {
        self.blocks[pos.index()]
    }

    #[inline]
    pub fn set(&mut self, pos: LocalPos, state: BlockState) {
        self.blocks[pos.index()] = state;
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(BlockState::is_air)
    }

    pub fn blocks(&self) -> &[BlockState; SECTION_VOLUME] {
        &self.blocks
    }

    /// Write the unmodified legacy form: version byte, 4096 id bytes, then
    /// 2048 bytes of aux nibbles (even index in the low nibble).
    pub fn write_raw(&self, out: &mut Vec<u8>) {
        out.reserve(1 + SECTION_VOLUME + SECTION_VOLUME / 2);
        out.push(RAW_SECTION_VERSION);
        out.extend(self.blocks.iter().map(|s| s.id.0 as u8));
        for pair in self.blocks.chunks_exact(2) {
            let lo = (pair[0].aux & 0xF) as u8;
            let hi = (pair[1].aux & 0xF) as u8;
            out.push(lo | (hi << 4));
        }
    }
}

impl std::fmt::Debug for SubChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_air = self.blocks.iter().filter(|s| !s.is_air()).count();
        f.debug_struct("SubChunk").field("non_air", &non_air).finish()
    }
}

/// A tile/block entity attached to a column. `tag` is its stored NBT.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    pub kind: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub tag: fastnbt::Value,
}

impl BlockEntity {
    /// Key used to index block entities inside a column.
    pub fn key(&self) -> u64 {
        let x = (self.x & 0xF) as u64;
        let z = (self.z & 0xF) as u64;
        let y = (self.y as u32 & 0xFFFF) as u64;
        (x << 20) | (z << 16) | y
    }
}

/// A vertical stack of subchunks plus the per-column trailing data.
///
/// `changes` counts block writes; it is the column's change timestamp used to
/// validate cached packets.
#[derive(Debug, Clone)]
pub struct ChunkColumn {
    sections: Vec<Option<SubChunk>>,
    biomes: Box<[u8; 256]>,
    extra_data: BTreeMap<i32, u16>,
    block_entities: BTreeMap<u64, BlockEntity>,
    changes: u64,
}

impl ChunkColumn {
    pub fn new() -> Self {
        Self {
            sections: vec![None; SECTION_COUNT],
            biomes: Box::new([0; 256]),
            extra_data: BTreeMap::new(),
            block_entities: BTreeMap::new(),
            changes: 0,
        }
    }

    pub fn changes(&self) -> u64 {
        self.changes
    }

    /// Record an external modification without touching block data.
    pub fn mark_changed(&mut self) {
        self.changes += 1;
    }

    pub fn section(&self, index: usize) -> Option<&SubChunk> {
        self.sections.get(index).and_then(Option::as_ref)
    }

    /// Install a whole subchunk (used by loaders; does not count as a change).
    /// Sections holding states without a raw form are refused.
    pub fn set_section(&mut self, index: usize, section: SubChunk) -> bool {
        if index >= SECTION_COUNT {
            return false;
        }
        if !section.blocks.iter().all(BlockState::is_legacy) {
            tracing::warn!("Rejecting subchunk {}: holds ids outside the legacy range", index);
            return false;
        }
        self.sections[index] = if section.is_empty() { None } else { Some(section) };
        true
    }

    pub fn is_section_empty(&self, index: usize) -> bool {
        self.section(index).is_none_or(SubChunk::is_empty)
    }

    /// One past the highest non-empty subchunk index (0 for an empty column).
    pub fn sub_chunk_count(&self) -> usize {
        (0..SECTION_COUNT)
            .rev()
            .find(|&i| !self.is_section_empty(i))
            .map_or(0, |i| i + 1)
    }

    /// Block at local x/z (0..16) and column y (0..256). Out of range is air.
    pub fn get_block(&self, x: u8, y: i32, z: u8) -> BlockState {
        if !(0..(SECTION_COUNT * SECTION_SIZE) as i32).contains(&y) {
            return BlockState::AIR;
        }
        match self.section((y >> 4) as usize) {
            Some(section) => section.get(LocalPos::new(x, (y & 0xF) as u8, z)),
            None => BlockState::AIR,
        }
    }

    /// Write a block. Returns false if `y` is outside the column or the state
    /// has no raw form (id above 255 or aux above 15).
    pub fn set_block(&mut self, x: u8, y: i32, z: u8, state: BlockState) -> bool {
        if !(0..(SECTION_COUNT * SECTION_SIZE) as i32).contains(&y) {
            return false;
        }
        if !state.is_legacy() {
            tracing::warn!(
                "Rejecting block {}:{} at ({}, {}, {}): outside the legacy id range",
                state.id.0,
                state.aux,
                x,
                y,
                z
            );
            return false;
        }
        let index = (y >> 4) as usize;
        let local = LocalPos::new(x, (y & 0xF) as u8, z);
        let slot = &mut self.sections[index];
        if state.is_air() {
            if let Some(section) = slot {
                section.set(local, state);
                if section.is_empty() {
                    *slot = None;
                }
            }
        } else {
            slot.get_or_insert_with(SubChunk::new_empty).set(local, state);
        }
        self.changes += 1;
        true
    }

    pub fn biomes(&self) -> &[u8; 256] {
        &self.biomes
    }

    pub fn set_biome(&mut self, x: u8, z: u8, biome: u8) {
        self.biomes[((z as usize & 0xF) << 4) | (x as usize & 0xF)] = biome;
    }

    pub fn set_biomes(&mut self, biomes: [u8; 256]) {
        *self.biomes = biomes;
    }

    pub fn extra_data(&self) -> &BTreeMap<i32, u16> {
        &self.extra_data
    }

    pub fn set_extra_data(&mut self, key: i32, value: u16) {
        self.extra_data.insert(key, value);
        self.changes += 1;
    }

    pub fn block_entities(&self) -> impl Iterator<Item = &BlockEntity> {
        self.block_entities.values()
    }

    pub fn add_block_entity(&mut self, entity: BlockEntity) {
        self.block_entities.insert(entity.key(), entity);
    }
}

impl Default for ChunkColumn {
    fn default() -> Self {
        Self::new()
    }
}
