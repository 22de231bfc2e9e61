//! World persistence in the legacy (numeric block id) Anvil format.
//!
//! Columns live in `<dir>/region/r.X.Z.mca`. Each section stores 4096 block
//! id bytes and 2048 bytes of aux nibbles in YZX order; the engine keeps its
//! subchunks in XZY order, so indices are remapped on the way in and out.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Seek};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use fastnbt::{ByteArray, Value};
use serde::{Deserialize, Serialize};

use veil_engine::world::block::{BlockId, BlockState};
use veil_engine::world::chunk::{BlockEntity, ChunkColumn, SECTION_COUNT, SECTION_VOLUME, SubChunk};
use veil_engine::world::position::{ChunkPos, LocalPos};
use veil_engine::world::{StorageFormat, World};

// ── Chunk NBT structs (serde) ────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug)]
struct ChunkNbt {
    #[serde(rename = "Level")]
    level: LevelNbt,
}

#[derive(Serialize, Deserialize, Debug)]
struct LevelNbt {
    #[serde(rename = "xPos")]
    x_pos: i32,
    #[serde(rename = "zPos")]
    z_pos: i32,
    #[serde(rename = "Sections", default, skip_serializing_if = "Vec::is_empty")]
    sections: Vec<SectionNbt>,
    #[serde(rename = "Biomes", default, skip_serializing_if = "Option::is_none")]
    biomes: Option<ByteArray>,
    /// Big-endian `count`, then `(key: i32, value: i16)` pairs.
    #[serde(rename = "ExtraData", default, skip_serializing_if = "Option::is_none")]
    extra_data: Option<ByteArray>,
    #[serde(rename = "TileEntities", default, skip_serializing_if = "Vec::is_empty")]
    tile_entities: Vec<Value>,
}

#[derive(Serialize, Deserialize, Debug)]
struct SectionNbt {
    #[serde(rename = "Y")]
    y: i8,
    #[serde(rename = "Blocks")]
    blocks: ByteArray,
    #[serde(rename = "Data")]
    data: ByteArray,
}

/// File order (`y << 8 | z << 4 | x`) for an engine position.
fn anvil_index(pos: LocalPos) -> usize {
    ((pos.y as usize) << 8) | ((pos.z as usize) << 4) | (pos.x as usize)
}

// ── Save ─────────────────────────────────────────────────────────────────────

/// Save only dirty (modified) columns under `<dir>/region/`.
///
/// Existing region files are opened and updated in place; new ones are created
/// as needed. Returns the number of columns written.
pub fn save_world(world: &World, dir: &Path) -> Result<usize> {
    let dirty = world.take_dirty_chunks();
    if dirty.is_empty() {
        tracing::info!("World save: nothing to save (no dirty chunks)");
        return Ok(0);
    }

    let start = Instant::now();
    let region_dir = dir.join("region");
    fs::create_dir_all(&region_dir)?;

    let mut region_chunks: HashMap<(i32, i32), Vec<(ChunkPos, Vec<u8>)>> = HashMap::new();
    for pos in dirty {
        let Some(column) = world.get_chunk(pos) else {
            continue;
        };
        let nbt = column_to_nbt(pos, &column);
        let bytes = fastnbt::to_bytes(&nbt)
            .with_context(|| format!("serializing chunk ({}, {})", pos.x, pos.z))?;
        region_chunks.entry(pos.region()).or_default().push((pos, bytes));
    }

    let mut total_chunks = 0usize;
    for ((rx, rz), chunks) in &region_chunks {
        let path = region_dir.join(format!("r.{}.{}.mca", rx, rz));
        let mut region = if path.exists() {
            let file_bytes =
                fs::read(&path).with_context(|| format!("reading region r.{}.{}", rx, rz))?;
            fastanvil::Region::from_stream(Cursor::new(file_bytes))
                .with_context(|| format!("parsing region r.{}.{}", rx, rz))?
        } else {
            fastanvil::Region::new(Cursor::new(Vec::new()))
                .with_context(|| format!("creating region r.{}.{}", rx, rz))?
        };

        for (pos, bytes) in chunks {
            let local_x = pos.x.rem_euclid(32) as usize;
            let local_z = pos.z.rem_euclid(32) as usize;
            region
                .write_chunk(local_x, local_z, bytes)
                .with_context(|| format!("writing chunk ({}, {})", pos.x, pos.z))?;
            total_chunks += 1;
        }

        let mut cursor = region.into_inner()?;
        let len = cursor.stream_position()?;
        let data = cursor.into_inner();
        fs::write(&path, &data[..len as usize])?;
    }

    tracing::info!(
        "World {} saved: {} dirty chunks across {} regions ({:.2?})",
        world.name(),
        total_chunks,
        region_chunks.len(),
        start.elapsed(),
    );
    Ok(total_chunks)
}

fn column_to_nbt(pos: ChunkPos, column: &ChunkColumn) -> ChunkNbt {
    let sections = (0..SECTION_COUNT)
        .filter_map(|index| column.section(index).map(|s| section_to_nbt(index, s)))
        .collect();

    let extra_data = (!column.extra_data().is_empty()).then(|| {
        let mut bytes = Vec::with_capacity(4 + column.extra_data().len() * 6);
        bytes.extend_from_slice(&(column.extra_data().len() as i32).to_be_bytes());
        for (&key, &value) in column.extra_data() {
            bytes.extend_from_slice(&key.to_be_bytes());
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        to_byte_array(bytes)
    });

    ChunkNbt {
        level: LevelNbt {
            x_pos: pos.x,
            z_pos: pos.z,
            sections,
            biomes: Some(to_byte_array(column.biomes().to_vec())),
            extra_data,
            tile_entities: column.block_entities().map(entity_to_nbt).collect(),
        },
    }
}

/// Columns only hold legacy states, so the id and aux casts are exact.
fn section_to_nbt(index: usize, section: &SubChunk) -> SectionNbt {
    let mut blocks = vec![0u8; SECTION_VOLUME];
    let mut data = vec![0u8; SECTION_VOLUME / 2];
    for (i, state) in section.blocks().iter().enumerate() {
        let file = anvil_index(LocalPos::from_index(i));
        blocks[file] = state.id.0 as u8;
        let nibble = (state.aux & 0xF) as u8;
        if file & 1 == 0 {
            data[file >> 1] |= nibble;
        } else {
            data[file >> 1] |= nibble << 4;
        }
    }
    SectionNbt {
        y: index as i8,
        blocks: to_byte_array(blocks),
        data: to_byte_array(data),
    }
}

fn entity_to_nbt(entity: &BlockEntity) -> Value {
    let mut tag = match &entity.tag {
        Value::Compound(entries) => entries.clone(),
        _ => HashMap::new(),
    };
    tag.insert("id".into(), Value::String(entity.kind.clone()));
    tag.insert("x".into(), Value::Int(entity.x));
    tag.insert("y".into(), Value::Int(entity.y));
    tag.insert("z".into(), Value::Int(entity.z));
    Value::Compound(tag)
}

fn to_byte_array(bytes: Vec<u8>) -> ByteArray {
    ByteArray::new(bytes.into_iter().map(|b| b as i8).collect())
}

// ── Load ─────────────────────────────────────────────────────────────────────

/// Load a world from region files under `<dir>/region/`.
///
/// Returns `None` if the region directory does not exist or holds no columns.
pub fn load_world(dir: &Path, name: &str, dimension: u8) -> Result<Option<World>> {
    let region_dir = dir.join("region");
    if !region_dir.is_dir() {
        return Ok(None);
    }

    let start = Instant::now();
    let world = World::new(name, dimension, StorageFormat::Anvil);
    let mut total_chunks = 0usize;
    let mut region_count = 0usize;

    for entry in fs::read_dir(&region_dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".mca") {
            continue;
        }

        let file = fs::File::open(&path)
            .with_context(|| format!("opening region file {}", path.display()))?;
        let mut region = fastanvil::Region::from_stream(file)
            .with_context(|| format!("parsing region file {}", path.display()))?;

        for x in 0..32usize {
            for z in 0..32usize {
                let Some(bytes) = region
                    .read_chunk(x, z)
                    .with_context(|| format!("reading chunk ({}, {}) from {}", x, z, file_name))?
                else {
                    continue;
                };
                let nbt: ChunkNbt = fastnbt::from_bytes(&bytes).with_context(|| {
                    format!("deserializing chunk ({}, {}) from {}", x, z, file_name)
                })?;
                let pos = ChunkPos::new(nbt.level.x_pos, nbt.level.z_pos);
                world.insert_chunk(pos, nbt_to_column(&nbt.level));
                total_chunks += 1;
            }
        }
        region_count += 1;
    }

    if total_chunks == 0 {
        return Ok(None);
    }

    tracing::info!(
        "World {} loaded: {} chunks from {} regions ({:.2?})",
        name,
        total_chunks,
        region_count,
        start.elapsed(),
    );
    Ok(Some(world))
}

fn nbt_to_column(level: &LevelNbt) -> ChunkColumn {
    let mut column = ChunkColumn::new();

    for section in &level.sections {
        let Ok(index) = usize::try_from(section.y) else {
            continue;
        };
        if index >= SECTION_COUNT || section.blocks.len() < SECTION_VOLUME {
            tracing::warn!("Skipping malformed section {} at ({}, {})", section.y, level.x_pos, level.z_pos);
            continue;
        }
        let mut sub = SubChunk::new_empty();
        for i in 0..SECTION_VOLUME {
            let pos = LocalPos::from_index(i);
            let file = anvil_index(pos);
            let id = section.blocks[file] as u8 as u16;
            let packed = section.data.get(file >> 1).map_or(0, |&b| b as u8);
            let aux = if file & 1 == 0 { packed & 0xF } else { packed >> 4 };
            sub.set(pos, BlockState::of(BlockId(id), aux as u16));
        }
        column.set_section(index, sub);
    }

    if let Some(biomes) = &level.biomes {
        if biomes.len() == 256 {
            let mut ids = [0u8; 256];
            for (dst, &src) in ids.iter_mut().zip(biomes.iter()) {
                *dst = src as u8;
            }
            column.set_biomes(ids);
        }
    }

    if let Some(extra) = &level.extra_data {
        let bytes: Vec<u8> = extra.iter().map(|&b| b as u8).collect();
        for (key, value) in parse_extra_data(&bytes) {
            column.set_extra_data(key, value);
        }
    }

    for tag in &level.tile_entities {
        match nbt_to_entity(tag) {
            Some(entity) => column.add_block_entity(entity),
            None => tracing::warn!("Skipping tile entity without id/position at ({}, {})", level.x_pos, level.z_pos),
        }
    }

    column
}

fn parse_extra_data(bytes: &[u8]) -> Vec<(i32, u16)> {
    let Some(count) = bytes.get(..4) else {
        return Vec::new();
    };
    let count = i32::from_be_bytes([count[0], count[1], count[2], count[3]]).max(0) as usize;
    bytes[4..]
        .chunks_exact(6)
        .take(count)
        .map(|entry| {
            let key = i32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]]);
            let value = u16::from_be_bytes([entry[4], entry[5]]);
            (key, value)
        })
        .collect()
}

fn nbt_to_entity(tag: &Value) -> Option<BlockEntity> {
    let Value::Compound(entries) = tag else {
        return None;
    };
    let int = |key: &str| match entries.get(key) {
        Some(Value::Int(v)) => Some(*v),
        _ => None,
    };
    let Some(Value::String(kind)) = entries.get("id") else {
        return None;
    };
    Some(BlockEntity {
        kind: kind.clone(),
        x: int("x")?,
        y: int("y")?,
        z: int("z")?,
        tag: tag.clone(),
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────
