//! Loading the runtime block-state table.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use veil_engine::registry::RuntimeTable;
use veil_engine::world::block::{BlockId, BlockState};

use crate::block::MAX_BLOCK_ID;

/// Aux variants per block id in the generated table.
pub const DEFAULT_VARIANTS: u16 = 16;

#[derive(Debug, Deserialize)]
struct StateEntry {
    id: u16,
    #[serde(default)]
    data: u16,
}

/// Parse a JSON list of `{"id": .., "data": ..}` states. The list position is
/// the runtime id.
pub fn parse_runtime_table(json: &str) -> Result<RuntimeTable> {
    let entries: Vec<StateEntry> = serde_json::from_str(json).context("parsing runtime table")?;
    let table = RuntimeTable::from_states(
        entries
            .into_iter()
            .map(|e| BlockState::of(BlockId(e.id), e.data)),
    )?;
    Ok(table)
}

/// Load the table at `path`, or generate the dense legacy table.
pub fn load_runtime_table(path: Option<&Path>) -> Result<RuntimeTable> {
    let Some(path) = path else {
        return Ok(RuntimeTable::sequential(MAX_BLOCK_ID + 1, DEFAULT_VARIANTS));
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading runtime table {}", path.display()))?;
    let table = parse_runtime_table(&text)?;
    tracing::info!("Loaded {} runtime states from {}", table.len(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_engine::registry::BlockRegistry;
    use veil_engine::world::block::RuntimeId;

    #[test]
    fn position_is_runtime_id() {
        let table = parse_runtime_table(r#"[{"id": 0}, {"id": 1}, {"id": 3, "data": 2}]"#).unwrap();
        assert_eq!(table.air(), RuntimeId(0));
        assert_eq!(
            table.runtime_id(BlockState::of(BlockId(3), 2)).unwrap(),
            RuntimeId(2)
        );
    }

    #[test]
    fn table_without_air_is_rejected() {
        assert!(parse_runtime_table(r#"[{"id": 1}]"#).is_err());
    }

    #[test]
    fn default_covers_every_legacy_state() {
        let table = load_runtime_table(None).unwrap();
        assert_eq!(table.len(), 256 * 16);
        assert!(table.runtime_id(BlockState::of(BlockId(255), 15)).is_ok());
    }
}
