pub mod block;
pub mod chunk;
pub mod position;

use std::sync::Arc;

use block::BlockState;
use chunk::ChunkColumn;
use dashmap::{DashMap, DashSet};
use position::ChunkPos;

/// On-disk format backing a world. Only some formats are handled by the
/// concealing chunk pipeline; the rest are served directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Anvil,
    LevelDb,
    Memory,
}

/// A serialized chunk packet kept in a column's cache slot.
///
/// `changes` is the column change counter the packet was built from;
/// `concealed` is set only by the concealing encoder.
#[derive(Debug, Clone)]
pub struct CachedPacket {
    pub changes: u64,
    pub concealed: bool,
    pub data: Arc<[u8]>,
}

/// One loaded world. Thread-safe, lock-sharded by column.
///
/// Columns are held behind `Arc` so readers get a cheap snapshot that stays
/// stable while the world keeps changing.
pub struct World {
    name: String,
    dimension: u8,
    format: StorageFormat,
    chunks: DashMap<ChunkPos, Arc<ChunkColumn>>,
    packets: DashMap<ChunkPos, CachedPacket>,
    /// Columns that have been modified since the last save.
    dirty: DashSet<ChunkPos>,
}

impl World {
    pub fn new(name: impl Into<String>, dimension: u8, format: StorageFormat) -> Self {
        Self {
            name: name.into(),
            dimension,
            format,
            chunks: DashMap::new(),
            packets: DashMap::new(),
            dirty: DashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> u8 {
        self.dimension
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    /// Snapshot of a column, if loaded.
    pub fn get_chunk(&self, pos: ChunkPos) -> Option<Arc<ChunkColumn>> {
        self.chunks.get(&pos).map(|c| Arc::clone(&c))
    }

    /// Insert a column without marking it dirty (used for generation/loading).
    pub fn insert_chunk(&self, pos: ChunkPos, column: ChunkColumn) {
        self.chunks.insert(pos, Arc::new(column));
        self.packets.remove(&pos);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Change counter of a loaded column.
    pub fn changes(&self, pos: ChunkPos) -> Option<u64> {
        self.chunks.get(&pos).map(|c| c.changes())
    }

    /// Read a block at absolute coordinates. Unloaded columns read as air.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockState {
        let pos = ChunkPos::new(x >> 4, z >> 4);
        match self.chunks.get(&pos) {
            Some(column) => column.get_block((x & 0xF) as u8, y, (z & 0xF) as u8),
            None => BlockState::AIR,
        }
    }

    /// Write a block at absolute coordinates, creating the column if needed.
    /// Marks the column dirty and drops its cached packet.
    pub fn set_block(&self, x: i32, y: i32, z: i32, state: BlockState) {
        let pos = ChunkPos::new(x >> 4, z >> 4);
        let mut entry = self.chunks.entry(pos).or_default();
        if Arc::make_mut(&mut entry).set_block((x & 0xF) as u8, y, (z & 0xF) as u8, state) {
            drop(entry);
            self.packets.remove(&pos);
            self.dirty.insert(pos);
        }
    }

    /// Apply an arbitrary edit to a loaded column. Counts as a change.
    pub fn modify_chunk<F>(&self, pos: ChunkPos, edit: F) -> bool
    where
        F: FnOnce(&mut ChunkColumn),
    {
        let Some(mut entry) = self.chunks.get_mut(&pos) else {
            return false;
        };
        let column = Arc::make_mut(&mut entry);
        edit(column);
        column.mark_changed();
        drop(entry);
        self.packets.remove(&pos);
        self.dirty.insert(pos);
        true
    }

    pub fn cached_packet(&self, pos: ChunkPos) -> Option<CachedPacket> {
        self.packets.get(&pos).map(|p| p.clone())
    }

    pub fn set_cached_packet(&self, pos: ChunkPos, packet: CachedPacket) {
        self.packets.insert(pos, packet);
    }

    /// Drain and return all column positions modified since the last call.
    pub fn take_dirty_chunks(&self) -> Vec<ChunkPos> {
        let dirty: Vec<ChunkPos> = self.dirty.iter().map(|e| *e).collect();
        for pos in &dirty {
            self.dirty.remove(pos);
        }
        dirty
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }
}
