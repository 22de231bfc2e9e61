//! Palette-packed chunk encoding.

pub mod column;
pub mod palette;
pub mod subchunk;
pub mod wire;
pub mod words;

use crate::registry::RegistryError;

pub use column::{ColumnEncoder, SectionsOutcome};
pub use palette::PaletteBuilder;
pub use subchunk::SubChunkEncoder;
pub use words::{BitWidth, PackedWords};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("palette exceeds 16-bit indices ({0} entries)")]
    PaletteOverflow(usize),
    #[error("writing varint: {0}")]
    Io(#[from] std::io::Error),
}
