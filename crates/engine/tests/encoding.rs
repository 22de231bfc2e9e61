//! Encoding properties of the palette-packed subchunk writer: exact empty
//! layout, border safety, palette shape, lossless widening, both concealment
//! modes and determinism.

use veil_engine::conceal::{ConcealMode, ConcealmentTable};
use veil_engine::encode::{ColumnEncoder, SubChunkEncoder};
use veil_engine::registry::{BlockRegistry, RuntimeTable};
use veil_engine::world::block::{BlockId, BlockState, RuntimeId};
use veil_engine::world::chunk::{ChunkColumn, SECTION_VOLUME, SubChunk};
use veil_engine::world::position::LocalPos;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const STONE: BlockState = BlockState::plain(BlockId(1));
const DIRT: BlockState = BlockState::plain(BlockId(3));
const GOLD_ORE: BlockState = BlockState::plain(BlockId(14));
const DIAMOND_ORE: BlockState = BlockState::plain(BlockId(56));
const GLASS: BlockId = BlockId(20);

/// Runtime id = block id for plain states; dirt variants follow at 512+.
fn registry() -> RuntimeTable {
    let plain = (0..512).map(|id| BlockState::plain(BlockId(id)));
    let dirt = (1..16).map(|aux| BlockState::of(DIRT.id, aux));
    RuntimeTable::from_states(plain.chain(dirt)).unwrap()
}

fn fixed(decoy: BlockState) -> ConcealmentTable {
    ConcealmentTable::new(
        [BlockId::AIR, GLASS],
        [GOLD_ORE.id, DIAMOND_ORE.id],
        ConcealMode::Fixed(decoy),
    )
}

fn decoys() -> [BlockState; 8] {
    std::array::from_fn(|i| BlockState::plain(BlockId(200 + i as u16)))
}

fn rotating() -> ConcealmentTable {
    ConcealmentTable::new([BlockId::AIR, GLASS], [], ConcealMode::Rotating(decoys()))
}

/// A table that never substitutes anything.
fn passthrough() -> ConcealmentTable {
    ConcealmentTable::new([BlockId::AIR], [], ConcealMode::Fixed(STONE))
}

/// One decoded paletted subchunk.
struct Decoded {
    header: u8,
    indices: Vec<u32>,
    palette: Vec<u32>,
    rest: Vec<u8>,
}

impl Decoded {
    fn runtime_at(&self, pos: LocalPos) -> u32 {
        self.palette[self.indices[pos.index()] as usize]
    }
}

fn read_var(bytes: &[u8], at: &mut usize) -> u32 {
    let mut value = 0u32;
    let mut shift = 0;
    loop {
        let b = bytes[*at];
        *at += 1;
        value |= ((b & 0x7F) as u32) << shift;
        if b & 0x80 == 0 {
            return value;
        }
        shift += 7;
    }
}

fn read_var_signed(bytes: &[u8], at: &mut usize) -> i32 {
    let raw = read_var(bytes, at);
    ((raw >> 1) as i32) ^ -((raw & 1) as i32)
}

fn decode(bytes: &[u8]) -> Decoded {
    assert_eq!(&bytes[..2], &[8, 2], "subchunk header");
    let header = bytes[2];
    let bits = (header >> 1) as usize;
    let word_count = SECTION_VOLUME * bits / 32;
    let mut at = 3;
    let words: Vec<u32> = (0..word_count)
        .map(|i| u32::from_le_bytes(bytes[3 + i * 4..7 + i * 4].try_into().unwrap()))
        .collect();
    at += word_count * 4;
    let mask = (1u32 << bits) - 1;
    let indices = (0..SECTION_VOLUME)
        .map(|i| {
            let bit = i * bits;
            (words[bit / 32] >> (bit % 32)) & mask
        })
        .collect();
    let count = read_var_signed(bytes, &mut at);
    let palette = (0..count).map(|_| read_var_signed(bytes, &mut at) as u32).collect();
    Decoded {
        header,
        indices,
        palette,
        rest: bytes[at..].to_vec(),
    }
}

fn encode(section: &SubChunk, table: &ConcealmentTable) -> Vec<u8> {
    let registry = registry();
    let mut encoder = SubChunkEncoder::new(registry.air()).unwrap();
    let mut out = Vec::new();
    encoder.encode(section, table, &registry, &mut out).unwrap();
    out
}

/// Solid stone with a scatter of ores and a glass pocket.
fn mixed_section() -> SubChunk {
    let mut section = SubChunk::new_filled(STONE);
    for i in (0..SECTION_VOLUME).step_by(37) {
        section.set(LocalPos::from_index(i), DIAMOND_ORE);
    }
    for i in (5..SECTION_VOLUME).step_by(101) {
        section.set(LocalPos::from_index(i), GOLD_ORE);
    }
    section.set(LocalPos::new(8, 8, 8), BlockState::plain(GLASS));
    section.set(LocalPos::new(3, 3, 3), BlockState::of(DIRT.id, 2));
    section
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn empty_subchunk_is_the_constant_block() {
    let registry = registry();
    let empty = SubChunk::new_empty();
    for table in [fixed(STONE), rotating(), passthrough()] {
        let mut encoder = SubChunkEncoder::new(registry.air()).unwrap();
        let expected = encoder.empty_section().to_vec();
        let mut out = Vec::new();
        encoder.encode(&empty, &table, &registry, &mut out).unwrap();
        assert_eq!(out, expected);
    }
}

#[test]
fn border_cells_are_never_altered() {
    let section = mixed_section();
    for table in [fixed(STONE), rotating()] {
        let decoded = decode(&encode(&section, &table));
        for i in 0..SECTION_VOLUME {
            let pos = LocalPos::from_index(i);
            if pos.is_border() {
                assert_eq!(
                    decoded.runtime_at(pos),
                    section.get(pos).id.0 as u32,
                    "border cell {:?} changed",
                    pos
                );
            }
        }
    }
}

#[test]
fn palette_starts_with_air() {
    let section = SubChunk::new_filled(STONE);
    let decoded = decode(&encode(&section, &passthrough()));
    assert_eq!(decoded.palette, vec![0, 1]);
    // Air is listed even though no cell uses it.
    assert!(decoded.indices.iter().all(|&i| i == 1));
}

#[test]
fn widening_is_lossless() {
    // 257 distinct non-air types: crosses 16 (4 -> 8 bits) and 256 (8 -> 16).
    let mut section = SubChunk::new_empty();
    for i in 0..SECTION_VOLUME {
        let id = (i % 257) as u16 + 1;
        section.set(LocalPos::from_index(i), BlockState::plain(BlockId(id)));
    }
    let decoded = decode(&encode(&section, &passthrough()));
    assert_eq!(decoded.header, (16 << 1) | 1);
    assert_eq!(decoded.palette.len(), 258);
    for i in 0..SECTION_VOLUME {
        let pos = LocalPos::from_index(i);
        assert_eq!(decoded.runtime_at(pos), section.get(pos).id.0 as u32, "cell {i}");
    }
}

#[test]
fn seventeen_entries_use_eight_bits() {
    let mut section = SubChunk::new_empty();
    for i in 0..SECTION_VOLUME {
        let id = (i % 17) as u16 + 1;
        section.set(LocalPos::from_index(i), BlockState::plain(BlockId(id)));
    }
    let decoded = decode(&encode(&section, &passthrough()));
    assert_eq!(decoded.header, (8 << 1) | 1);
    assert_eq!(decoded.palette.len(), 18);
    for i in 0..SECTION_VOLUME {
        let pos = LocalPos::from_index(i);
        assert_eq!(decoded.runtime_at(pos), section.get(pos).id.0 as u32);
    }
}

#[test]
fn rotating_mode_picks_decoy_by_scan_index() {
    let section = mixed_section();
    let table = rotating();
    let decoded = decode(&encode(&section, &table));
    let decoys = decoys();
    let mut substituted = 0;
    for i in 0..SECTION_VOLUME {
        let pos = LocalPos::from_index(i);
        if pos.is_border() {
            continue;
        }
        let neighbors = pos.neighbors().map(|n| section.get(n));
        if table.is_enclosed(&neighbors) {
            assert_eq!(decoded.runtime_at(pos), decoys[i % 8].id.0 as u32);
            substituted += 1;
        } else {
            assert_eq!(decoded.runtime_at(pos), section.get(pos).id.0 as u32);
        }
    }
    assert!(substituted > 2000);
}

#[test]
fn fixed_mode_only_replaces_value_bearing_blocks() {
    let decoy = BlockState::plain(BlockId(99));
    let section = mixed_section();
    let decoded = decode(&encode(&section, &fixed(decoy)));

    // Enclosed diamond ore at index 37 * 20 = 740 -> (2, 4, 14).
    let ore = LocalPos::from_index(740);
    assert_eq!(section.get(ore), DIAMOND_ORE);
    assert!(!ore.is_border());
    assert_eq!(decoded.runtime_at(ore), 99);

    // Enclosed non-ore keeps its identity and aux data.
    let dirt = LocalPos::new(3, 3, 3);
    let expected = registry().runtime_id(BlockState::of(DIRT.id, 2)).unwrap();
    assert_eq!(decoded.runtime_at(dirt), expected.0);

    // Ore touching the glass pocket is visible and stays ore.
    let mut exposed = SubChunk::new_filled(STONE);
    exposed.set(LocalPos::new(8, 8, 8), BlockState::plain(GLASS));
    exposed.set(LocalPos::new(8, 9, 8), DIAMOND_ORE);
    let decoded = decode(&encode(&exposed, &fixed(decoy)));
    assert_eq!(decoded.runtime_at(LocalPos::new(8, 9, 8)), DIAMOND_ORE.id.0 as u32);
}

#[test]
fn single_ore_in_stone_end_to_end() {
    let decoy = BlockState::plain(BlockId(99));
    let mut section = SubChunk::new_filled(STONE);
    let ore = LocalPos::new(5, 5, 5);
    section.set(ore, DIAMOND_ORE);

    let decoded = decode(&encode(&section, &fixed(decoy)));
    assert_eq!(decoded.palette, vec![0, 1, 99]);
    assert_eq!(decoded.indices[ore.index()], 2);
    assert_eq!(decoded.header, (4 << 1) | 1);

    let registry = registry();
    let empty_storage = SubChunkEncoder::new(registry.air()).unwrap().empty_storage().to_vec();
    assert_eq!(decoded.rest, empty_storage);
}

#[test]
fn decisions_use_true_neighbors() {
    // Two adjacent enclosed ores: each is decided on the other's true state,
    // so both are replaced regardless of which is visited first.
    let decoy = BlockState::plain(BlockId(99));
    let mut section = SubChunk::new_filled(STONE);
    section.set(LocalPos::new(6, 6, 6), DIAMOND_ORE);
    section.set(LocalPos::new(6, 7, 6), DIAMOND_ORE);
    let decoded = decode(&encode(&section, &fixed(decoy)));
    assert_eq!(decoded.runtime_at(LocalPos::new(6, 6, 6)), 99);
    assert_eq!(decoded.runtime_at(LocalPos::new(6, 7, 6)), 99);
}

#[test]
fn encoding_is_deterministic() {
    let registry = registry();
    let mut column = ChunkColumn::new();
    for y in 0..40 {
        for x in 0..16u8 {
            for z in 0..16u8 {
                let state = if (x as i32 + y + z as i32) % 11 == 0 { DIAMOND_ORE } else { STONE };
                column.set_block(x, y, z, state);
            }
        }
    }
    column.set_extra_data(5, 9);

    let table = rotating();
    let mut encoder = ColumnEncoder::new(registry.air(), 15).unwrap();
    let mut first = Vec::new();
    encoder.write_sections(&column, &table, &registry, &mut first);
    encoder.write_trailer(&column, &mut first).unwrap();

    // Reusing the same scratch state must not leak into the next payload.
    let mut second = Vec::new();
    encoder.write_sections(&column, &table, &registry, &mut second);
    encoder.write_trailer(&column, &mut second).unwrap();
    assert_eq!(first, second);

    let mut fresh = ColumnEncoder::new(RuntimeId(0), 15).unwrap();
    let mut third = Vec::new();
    fresh.write_sections(&column, &table, &registry, &mut third);
    fresh.write_trailer(&column, &mut third).unwrap();
    assert_eq!(first, third);
}
