//! Legacy Bedrock block ids and the default concealment tables.
//!
//! Ids are the numeric block ids stored in legacy Anvil sections; the runtime
//! table maps `(id, aux)` pairs to wire ids.

use veil_engine::world::block::{BlockId, BlockState};

pub const AIR: BlockId = BlockId(0);
pub const STONE: BlockId = BlockId(1);
pub const GRASS: BlockId = BlockId(2);
pub const DIRT: BlockId = BlockId(3);
pub const COBBLESTONE: BlockId = BlockId(4);
pub const SAPLING: BlockId = BlockId(6);
pub const BEDROCK: BlockId = BlockId(7);
pub const WATER: BlockId = BlockId(8);
pub const STILL_WATER: BlockId = BlockId(9);
pub const LAVA: BlockId = BlockId(10);
pub const STILL_LAVA: BlockId = BlockId(11);
pub const SAND: BlockId = BlockId(12);
pub const GRAVEL: BlockId = BlockId(13);
pub const GOLD_ORE: BlockId = BlockId(14);
pub const IRON_ORE: BlockId = BlockId(15);
pub const COAL_ORE: BlockId = BlockId(16);
pub const LEAVES: BlockId = BlockId(18);
pub const GLASS: BlockId = BlockId(20);
pub const LAPIS_ORE: BlockId = BlockId(21);
pub const TALL_GRASS: BlockId = BlockId(31);
pub const DANDELION: BlockId = BlockId(37);
pub const RED_FLOWER: BlockId = BlockId(38);
pub const TORCH: BlockId = BlockId(50);
pub const MONSTER_SPAWNER: BlockId = BlockId(52);
pub const CHEST: BlockId = BlockId(54);
pub const DIAMOND_ORE: BlockId = BlockId(56);
pub const LADDER: BlockId = BlockId(65);
pub const RAIL: BlockId = BlockId(66);
pub const REDSTONE_ORE: BlockId = BlockId(73);
pub const GLOWING_REDSTONE_ORE: BlockId = BlockId(74);
pub const FENCE: BlockId = BlockId(85);
pub const NETHERRACK: BlockId = BlockId(87);
pub const GLOWSTONE: BlockId = BlockId(89);
pub const GLASS_PANE: BlockId = BlockId(102);
pub const END_STONE: BlockId = BlockId(121);
pub const EMERALD_ORE: BlockId = BlockId(129);
pub const QUARTZ_ORE: BlockId = BlockId(153);
pub const LEAVES2: BlockId = BlockId(161);

/// Highest legacy block id the default runtime table covers.
pub const MAX_BLOCK_ID: u16 = 255;

/// Rotating decoys, indexed by `scan_index & 7`.
pub const DECOY_ORES: [BlockId; 8] = [
    GOLD_ORE,
    IRON_ORE,
    COAL_ORE,
    LAPIS_ORE,
    DIAMOND_ORE,
    REDSTONE_ORE,
    EMERALD_ORE,
    QUARTZ_ORE,
];

/// Value-bearing blocks hidden in fixed-replacement mode.
pub const DEFAULT_ORES: &[BlockId] = &[
    GOLD_ORE,
    IRON_ORE,
    COAL_ORE,
    LAPIS_ORE,
    DIAMOND_ORE,
    REDSTONE_ORE,
    GLOWING_REDSTONE_ORE,
    EMERALD_ORE,
    QUARTZ_ORE,
];

/// Blocks a player can see through. Everything else hides its neighbors.
pub const DEFAULT_TRANSPARENT: &[BlockId] = &[
    AIR,
    SAPLING,
    WATER,
    STILL_WATER,
    LAVA,
    STILL_LAVA,
    LEAVES,
    GLASS,
    TALL_GRASS,
    DANDELION,
    RED_FLOWER,
    TORCH,
    MONSTER_SPAWNER,
    CHEST,
    LADDER,
    RAIL,
    FENCE,
    GLASS_PANE,
    LEAVES2,
];

/// Fixed decoy per dimension: overworld, nether, end.
pub const DEFAULT_DECOYS: [BlockId; 3] = [STONE, NETHERRACK, END_STONE];

pub fn decoy_states() -> [BlockState; 8] {
    DECOY_ORES.map(BlockState::plain)
}

/// Block entity kinds the client renders and therefore needs in the chunk.
pub const SPAWNABLE_BLOCK_ENTITIES: &[&str] = &[
    "Banner",
    "Barrel",
    "Beacon",
    "Bed",
    "Bell",
    "BrewingStand",
    "Campfire",
    "Cauldron",
    "Chest",
    "Comparator",
    "Conduit",
    "EnchantTable",
    "EndGateway",
    "EnderChest",
    "FlowerPot",
    "Furnace",
    "Hopper",
    "ItemFrame",
    "Jukebox",
    "Lectern",
    "MobSpawner",
    "PistonArm",
    "ShulkerBox",
    "Sign",
    "Skull",
];

pub fn is_spawnable(kind: &str) -> bool {
    SPAWNABLE_BLOCK_ENTITIES.contains(&kind)
}
