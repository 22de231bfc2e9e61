//! Chunk column payload: subchunks followed by the per-column trailer.

use crate::conceal::ConcealmentTable;
use crate::registry::BlockRegistry;
use crate::world::block::RuntimeId;
use crate::world::chunk::{ChunkColumn, SubChunk};

use super::EncodeError;
use super::subchunk::SubChunkEncoder;
use super::wire;

/// Education Edition border-block list; always empty here.
pub const BORDER_BLOCKS: [u8; 1] = [0];

/// How the subchunk part of a payload came out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionsOutcome {
    /// Subchunks written (one past the highest non-empty one).
    pub count: usize,
    /// True when concealment was abandoned and every subchunk went out raw.
    pub fallback: bool,
}

/// Writes whole columns. Subchunks with index `> ceiling` are written raw.
pub struct ColumnEncoder {
    sections: SubChunkEncoder,
    ceiling: usize,
    raw_empty: Vec<u8>,
}

impl ColumnEncoder {
    pub fn new(air: RuntimeId, ceiling: usize) -> Result<Self, EncodeError> {
        let mut raw_empty = Vec::new();
        SubChunk::new_empty().write_raw(&mut raw_empty);
        Ok(Self {
            sections: SubChunkEncoder::new(air)?,
            ceiling,
            raw_empty,
        })
    }

    /// Append every subchunk up to the highest non-empty one.
    ///
    /// If any subchunk fails to encode, everything this call wrote is
    /// discarded and the column is rewritten in raw form; there is no
    /// partial concealment.
    pub fn write_sections<R: BlockRegistry + ?Sized>(
        &mut self,
        column: &ChunkColumn,
        table: &ConcealmentTable,
        registry: &R,
        out: &mut Vec<u8>,
    ) -> SectionsOutcome {
        let start = out.len();
        let count = column.sub_chunk_count();
        match self.try_write_sections(column, count, table, registry, out) {
            Ok(()) => SectionsOutcome { count, fallback: false },
            Err(e) => {
                tracing::debug!("An error occurred while calculating chunk data: {}", e);
                out.truncate(start);
                self.write_raw_sections(column, count, out);
                SectionsOutcome { count, fallback: true }
            }
        }
    }

    fn try_write_sections<R: BlockRegistry + ?Sized>(
        &mut self,
        column: &ChunkColumn,
        count: usize,
        table: &ConcealmentTable,
        registry: &R,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        for index in 0..count {
            match column.section(index) {
                None => out.extend_from_slice(self.sections.empty_section()),
                Some(section) if section.is_empty() => {
                    out.extend_from_slice(self.sections.empty_section())
                }
                Some(section) if index <= self.ceiling => {
                    self.sections.encode(section, table, registry, out)?
                }
                Some(section) => section.write_raw(out),
            }
        }
        Ok(())
    }

    /// Unconcealed form of the first `count` subchunks, all in the legacy
    /// layout, gaps included.
    pub fn write_raw_sections(&self, column: &ChunkColumn, count: usize, out: &mut Vec<u8>) {
        for index in 0..count {
            match column.section(index) {
                Some(section) => section.write_raw(out),
                None => out.extend_from_slice(&self.raw_empty),
            }
        }
    }

    /// Biome ids, border blocks and block extra data.
    pub fn write_trailer(&self, column: &ChunkColumn, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        out.extend_from_slice(column.biomes());
        out.extend_from_slice(&BORDER_BLOCKS);
        let extra = column.extra_data();
        wire::write_var_u32(out, extra.len() as u32)?;
        for (&key, &value) in extra {
            wire::write_var_i32(out, key)?;
            wire::write_u16_le(out, value);
        }
        Ok(())
    }
}
