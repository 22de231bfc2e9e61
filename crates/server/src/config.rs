//! Server configuration, read from an optional JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use veil_engine::conceal::{ConcealMode, ConcealmentTable};
use veil_engine::world::block::{BlockId, BlockState};

use crate::block;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VeilConfig {
    /// Blocks above this height are sent unconcealed.
    pub scan_height_limit: u32,
    /// Keep built chunk packets in the world's cache slot.
    pub memory_cache: bool,
    /// Replace every enclosed block with rotating fake ores instead of only
    /// replacing enclosed ores.
    pub obfuscator_mode: bool,
    pub ores: Vec<u16>,
    pub transparent_blocks: Vec<u16>,
    /// Fixed decoy per dimension: overworld, nether, end.
    pub decoy_blocks: [u16; 3],
    /// Worlds the handler runs for; empty means all of them.
    pub worlds: Vec<String>,
    pub tick_interval_ms: u64,
    /// JSON list of `{"id", "data"}` states; position is the runtime id.
    pub runtime_table: Option<PathBuf>,
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self {
            scan_height_limit: 64,
            memory_cache: true,
            obfuscator_mode: false,
            ores: block::DEFAULT_ORES.iter().map(|b| b.0).collect(),
            transparent_blocks: block::DEFAULT_TRANSPARENT.iter().map(|b| b.0).collect(),
            decoy_blocks: block::DEFAULT_DECOYS.map(|b| b.0),
            worlds: Vec::new(),
            tick_interval_ms: 50,
            runtime_table: None,
        }
    }
}

impl VeilConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Highest subchunk index that gets concealed.
    pub fn section_ceiling(&self) -> usize {
        (self.scan_height_limit.clamp(1, 255) >> 4) as usize
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn is_enabled(&self, world: &str) -> bool {
        self.worlds.is_empty() || self.worlds.iter().any(|w| w == world)
    }

    pub fn decoy_for(&self, dimension: u8) -> BlockState {
        let index = ((dimension & 3) as usize).min(self.decoy_blocks.len() - 1);
        BlockState::plain(BlockId(self.decoy_blocks[index]))
    }

    /// The immutable concealment table for one world.
    pub fn concealment_table(&self, dimension: u8) -> ConcealmentTable {
        let mode = if self.obfuscator_mode {
            ConcealMode::Rotating(block::decoy_states())
        } else {
            ConcealMode::Fixed(self.decoy_for(dimension))
        };
        ConcealmentTable::new(
            self.transparent_blocks.iter().map(|&id| BlockId(id)),
            self.ores.iter().map(|&id| BlockId(id)),
            mode,
        )
    }
}
