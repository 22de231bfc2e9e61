//! Full chunk-column payloads: subchunks, trailer and block entities.

use std::collections::HashMap;
use std::sync::Arc;

use fastnbt::Value;
use veil_engine::conceal::ConcealmentTable;
use veil_engine::encode::{ColumnEncoder, EncodeError};
use veil_engine::registry::BlockRegistry;
use veil_engine::world::block::RuntimeId;
use veil_engine::world::chunk::{BlockEntity, ChunkColumn};

use crate::block;
use crate::nbt::{self, NbtError};

/// Serialized column data, ready to be framed into a level-chunk packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPayload {
    pub sub_chunk_count: usize,
    pub data: Arc<[u8]>,
}

/// A payload plus how it was produced.
#[derive(Debug, Clone)]
pub struct PreparedChunk {
    pub payload: ChunkPayload,
    /// Subchunks went out raw because concealment failed.
    pub fallback: bool,
}

/// Owns the encoder scratch and the output buffer; reused for every column.
pub struct PayloadBuilder {
    encoder: ColumnEncoder,
    buf: Vec<u8>,
}

impl PayloadBuilder {
    pub fn new(air: RuntimeId, ceiling: usize) -> Result<Self, EncodeError> {
        Ok(Self {
            encoder: ColumnEncoder::new(air, ceiling)?,
            buf: Vec::with_capacity(64 * 1024),
        })
    }

    pub fn build<R: BlockRegistry + ?Sized>(
        &mut self,
        column: &ChunkColumn,
        table: &ConcealmentTable,
        registry: &R,
    ) -> Result<PreparedChunk, EncodeError> {
        self.buf.clear();
        let outcome = self
            .encoder
            .write_sections(column, table, registry, &mut self.buf);
        self.encoder.write_trailer(column, &mut self.buf)?;
        self.finish_entities(column);

        Ok(PreparedChunk {
            payload: ChunkPayload {
                sub_chunk_count: outcome.count,
                data: Arc::from(self.buf.as_slice()),
            },
            fallback: outcome.fallback,
        })
    }

    /// Unconcealed payload, as served for worlds the handler does not cover.
    pub fn build_raw(&mut self, column: &ChunkColumn) -> Result<ChunkPayload, EncodeError> {
        self.buf.clear();
        let count = column.sub_chunk_count();
        self.encoder.write_raw_sections(column, count, &mut self.buf);
        self.encoder.write_trailer(column, &mut self.buf)?;
        self.finish_entities(column);
        Ok(ChunkPayload {
            sub_chunk_count: count,
            data: Arc::from(self.buf.as_slice()),
        })
    }

    fn finish_entities(&mut self, column: &ChunkColumn) {
        let start = self.buf.len();
        if let Err(e) = write_block_entities(column, &mut self.buf) {
            tracing::debug!("Skipping block entities: {}", e);
            self.buf.truncate(start);
        }
    }
}

/// Spawn compounds of every client-visible block entity, back to back.
pub fn write_block_entities(column: &ChunkColumn, out: &mut Vec<u8>) -> Result<(), NbtError> {
    for entity in column.block_entities() {
        if !block::is_spawnable(&entity.kind) {
            continue;
        }
        nbt::write_compound(out, &spawn_compound(entity))?;
    }
    Ok(())
}

/// The stored tag with identity and position forced to the entity's own.
pub fn spawn_compound(entity: &BlockEntity) -> HashMap<String, Value> {
    let mut tag = match &entity.tag {
        Value::Compound(entries) => entries.clone(),
        _ => HashMap::new(),
    };
    tag.insert("id".into(), Value::String(entity.kind.clone()));
    tag.insert("x".into(), Value::Int(entity.x));
    tag.insert("y".into(), Value::Int(entity.y));
    tag.insert("z".into(), Value::Int(entity.z));
    tag
}
