//! Seeded ore world used when nothing is saved on disk.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;
use veil_engine::world::block::{BlockId, BlockState};
use veil_engine::world::chunk::{BlockEntity, ChunkColumn};
use veil_engine::world::position::ChunkPos;
use veil_engine::world::{StorageFormat, World};

use crate::block;

/// Top of the stone layer.
pub const STONE_TOP: i32 = 58;
/// Grass surface height.
pub const SURFACE: i32 = 63;

const SHALLOW_ORES: [BlockId; 3] = [block::COAL_ORE, block::IRON_ORE, block::COAL_ORE];
const DEEP_ORES: [BlockId; 5] = [
    block::DIAMOND_ORE,
    block::GOLD_ORE,
    block::REDSTONE_ORE,
    block::LAPIS_ORE,
    block::IRON_ORE,
];

/// Stone ground with scattered ore, a grass surface and a chest per column,
/// covering `-radius..radius` on both axes. Same seed, same world.
///
/// Bedrock at y=0, stone up to [`STONE_TOP`], dirt above it, grass at
/// [`SURFACE`].
pub fn ore_world(name: &str, radius: i32, seed: u64) -> World {
    let world = World::new(name, 0, StorageFormat::Anvil);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    for cx in -radius..radius {
        for cz in -radius..radius {
            world.insert_chunk(ChunkPos::new(cx, cz), ore_column(cx, cz, &mut rng));
        }
    }
    world
}

fn ore_column(cx: i32, cz: i32, rng: &mut Xoshiro256PlusPlus) -> ChunkColumn {
    let mut column = ChunkColumn::new();
    for x in 0..16u8 {
        for z in 0..16u8 {
            column.set_block(x, 0, z, BlockState::plain(block::BEDROCK));
            for y in 1..=STONE_TOP {
                let id = match rng.gen_range(0..200) {
                    0 => ore_for_depth(y, rng),
                    1..=3 => block::GRAVEL,
                    _ => block::STONE,
                };
                column.set_block(x, y, z, BlockState::plain(id));
            }
            for y in STONE_TOP + 1..SURFACE {
                column.set_block(x, y, z, BlockState::plain(block::DIRT));
            }
            column.set_block(x, SURFACE, z, BlockState::plain(block::GRASS));
            column.set_biome(x, z, 1);
        }
    }
    column.set_block(8, SURFACE + 1, 8, BlockState::plain(block::CHEST));
    column.add_block_entity(BlockEntity {
        kind: "Chest".into(),
        x: cx * 16 + 8,
        y: SURFACE + 1,
        z: cz * 16 + 8,
        tag: fastnbt::Value::Compound(Default::default()),
    });
    column
}

fn ore_for_depth(y: i32, rng: &mut Xoshiro256PlusPlus) -> BlockId {
    let pool: &[BlockId] = if y < 16 { &DEEP_ORES } else { &SHALLOW_ORES };
    pool.choose(rng).copied().unwrap_or(block::STONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(world: &World, pos: ChunkPos) -> Vec<BlockState> {
        let column = world.get_chunk(pos).unwrap();
        (0..=SURFACE + 1)
            .flat_map(|y| (0..16u8).flat_map(move |x| (0..16u8).map(move |z| (x, y, z))))
            .map(|(x, y, z)| column.get_block(x, y, z))
            .collect()
    }

    #[test]
    fn same_seed_same_world() {
        let a = ore_world("a", 1, 7);
        let b = ore_world("b", 1, 7);
        assert_eq!(a.chunk_count(), 4);
        for pos in [ChunkPos::new(-1, -1), ChunkPos::new(0, 0)] {
            assert_eq!(blocks(&a, pos), blocks(&b, pos));
        }
        let c = ore_world("c", 1, 8);
        assert_ne!(blocks(&a, ChunkPos::new(0, 0)), blocks(&c, ChunkPos::new(0, 0)));
    }

    #[test]
    fn layers_and_ore_placement() {
        let world = ore_world("w", 1, 42);
        let column = world.get_chunk(ChunkPos::new(0, 0)).unwrap();
        assert_eq!(column.get_block(3, 0, 3).id, block::BEDROCK);
        assert_eq!(column.get_block(3, SURFACE, 3).id, block::GRASS);
        assert_eq!(column.get_block(3, SURFACE - 1, 3).id, block::DIRT);
        assert_eq!(column.get_block(8, SURFACE + 1, 8).id, block::CHEST);
        assert_eq!(column.block_entities().count(), 1);

        let mut ores = 0;
        for x in 0..16u8 {
            for z in 0..16u8 {
                for y in 1..=STONE_TOP {
                    let id = column.get_block(x, y, z).id;
                    if DEEP_ORES.contains(&id) || SHALLOW_ORES.contains(&id) {
                        ores += 1;
                        if y >= 16 {
                            assert!(SHALLOW_ORES.contains(&id));
                        }
                    }
                }
            }
        }
        assert!(ores > 0);
        assert_eq!(world.dirty_count(), 0);
    }
}
