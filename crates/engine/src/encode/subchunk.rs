use crate::conceal::ConcealmentTable;
use crate::registry::BlockRegistry;
use crate::world::block::RuntimeId;
use crate::world::chunk::{SECTION_SIZE, SubChunk};
use crate::world::position::LocalPos;

use super::EncodeError;
use super::palette::PaletteBuilder;
use super::wire;
use super::words::PackedWords;

/// Paletted subchunk version byte.
pub const SUB_CHUNK_VERSION: u8 = 8;
/// Block layers per subchunk: the real one plus the always-empty second layer.
pub const STORAGE_COUNT: u8 = 2;
pub const SECTION_HEADER: [u8; 2] = [SUB_CHUNK_VERSION, STORAGE_COUNT];

/// Header of a 1-bit storage; only used for the all-air layer.
const SINGLE_BIT_HEADER: u8 = (1 << 1) | 1;
const SINGLE_BIT_WORDS: usize = 4096 / 32;

/// Encodes subchunks into the palette-packed wire form, concealing enclosed
/// blocks on the way.
///
/// Owns the scratch word array, which is reset at the start of every
/// encoding; one encoder must not be shared between concurrent encodings.
pub struct SubChunkEncoder {
    words: PackedWords,
    air: RuntimeId,
    empty_storage: Vec<u8>,
    empty_section: Vec<u8>,
}

impl SubChunkEncoder {
    /// Builds the encoder along with its all-air storage and section blocks.
    pub fn new(air: RuntimeId) -> Result<Self, EncodeError> {
        let mut empty_storage = Vec::with_capacity(1 + SINGLE_BIT_WORDS * 4 + 8);
        empty_storage.push(SINGLE_BIT_HEADER);
        empty_storage.resize(1 + SINGLE_BIT_WORDS * 4, 0);
        wire::write_var_i32(&mut empty_storage, 1)?;
        wire::write_var_i32(&mut empty_storage, air.0 as i32)?;

        let mut empty_section = SECTION_HEADER.to_vec();
        empty_section.extend_from_slice(&empty_storage);
        empty_section.extend_from_slice(&empty_storage);

        Ok(Self {
            words: PackedWords::new(),
            air,
            empty_storage,
            empty_section,
        })
    }

    /// A single all-air block layer.
    pub fn empty_storage(&self) -> &[u8] {
        &self.empty_storage
    }

    /// A complete subchunk consisting of two all-air layers.
    pub fn empty_section(&self) -> &[u8] {
        &self.empty_section
    }

    /// Append the wire form of `section` to `out`.
    ///
    /// Empty subchunks short-circuit to [`empty_section`]. On error `out` may
    /// hold a partial subchunk; callers discard it.
    ///
    /// [`empty_section`]: SubChunkEncoder::empty_section
    pub fn encode<R: BlockRegistry + ?Sized>(
        &mut self,
        section: &SubChunk,
        table: &ConcealmentTable,
        registry: &R,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        if section.is_empty() {
            out.extend_from_slice(&self.empty_section);
            return Ok(());
        }

        self.words.reset();
        let mut palette = PaletteBuilder::new(self.air);

        for x in 0..SECTION_SIZE as u8 {
            for z in 0..SECTION_SIZE as u8 {
                for y in 0..SECTION_SIZE as u8 {
                    let pos = LocalPos::new(x, y, z);
                    let state = table.decide(section, pos);
                    let runtime_id = registry.runtime_id(state)?;
                    let index = palette.intern(runtime_id, &mut self.words)?;
                    self.words.set(pos.index(), index);
                }
            }
        }

        out.extend_from_slice(&SECTION_HEADER);
        out.push(self.words.width().header());
        for &word in self.words.as_words() {
            wire::write_u32_le(out, word);
        }
        wire::write_var_i32(out, palette.len() as i32)?;
        for id in palette.entries() {
            wire::write_var_i32(out, id.0 as i32)?;
        }
        out.extend_from_slice(&self.empty_storage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conceal::ConcealMode;
    use crate::registry::RuntimeTable;
    use crate::world::block::{BlockId, BlockState};

    fn table() -> ConcealmentTable {
        ConcealmentTable::new(
            [BlockId::AIR],
            [BlockId(56)],
            ConcealMode::Fixed(BlockState::plain(BlockId(1))),
        )
    }

    #[test]
    fn empty_section_layout() {
        let encoder = SubChunkEncoder::new(RuntimeId(134)).unwrap();
        let storage = encoder.empty_storage();
        assert_eq!(storage[0], 3);
        assert!(storage[1..513].iter().all(|&b| b == 0));
        assert_eq!(&storage[513..], &[2, 0x8C, 0x02]);
        assert_eq!(&encoder.empty_section()[..2], &[8, 2]);
        assert_eq!(encoder.empty_section().len(), 2 + 2 * storage.len());
    }

    #[test]
    fn registry_miss_is_reported() {
        let registry = RuntimeTable::sequential(2, 1);
        let mut encoder = SubChunkEncoder::new(registry.air()).unwrap();
        let mut section = SubChunk::new_empty();
        section.set(LocalPos::new(0, 0, 0), BlockState::plain(BlockId(9)));
        let mut out = Vec::new();
        let err = encoder.encode(&section, &table(), &registry, &mut out).unwrap_err();
        assert!(matches!(err, EncodeError::Registry(_)));
    }

    #[test]
    fn minimal_section_uses_four_bits() {
        let registry = RuntimeTable::sequential(8, 1);
        let mut encoder = SubChunkEncoder::new(registry.air()).unwrap();
        let mut section = SubChunk::new_empty();
        section.set(LocalPos::new(0, 0, 0), BlockState::plain(BlockId(1)));
        let mut out = Vec::new();
        encoder.encode(&section, &table(), &registry, &mut out).unwrap();
        assert_eq!(&out[..3], &[8, 2, 9]);
        // 512 words, palette count 2, entries air(0) and stone(1).
        assert_eq!(&out[3 + 2048..3 + 2048 + 3], &[4, 0, 2]);
        assert_eq!(&out[3 + 2048 + 3..], encoder.empty_storage());
    }
}
