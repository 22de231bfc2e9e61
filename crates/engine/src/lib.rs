//! Chunk encoding engine.
//!
//! Re-encodes loaded chunk columns into the compact palette-packed network
//! form, replacing blocks that no honest client could see with decoys.

pub mod conceal;
pub mod encode;
pub mod registry;
pub mod world;
