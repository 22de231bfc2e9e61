//! Fixed-capacity bit-packed storage for the 4096 palette indices of one
//! subchunk.
//!
//! Entries are laid out back to back in little-endian 32-bit words at bit
//! offset `index * width`; all supported widths divide 32, so no entry ever
//! straddles two words.

use crate::world::chunk::SECTION_VOLUME;

/// Entry width of a packed index array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BitWidth {
    Four,
    Eight,
    Sixteen,
}

impl BitWidth {
    pub const fn bits(self) -> u32 {
        match self {
            BitWidth::Four => 4,
            BitWidth::Eight => 8,
            BitWidth::Sixteen => 16,
        }
    }

    /// Largest palette index representable at this width.
    pub const fn max_value(self) -> u32 {
        (1 << self.bits()) - 1
    }

    /// Storage header byte: `bits << 1 | 1` (the low bit flags runtime ids).
    pub const fn header(self) -> u8 {
        ((self.bits() as u8) << 1) | 1
    }

    /// Number of 32-bit words holding 4096 entries.
    pub const fn word_count(self) -> usize {
        SECTION_VOLUME * self.bits() as usize / 32
    }

    /// The next wider width, if any.
    pub const fn next(self) -> Option<BitWidth> {
        match self {
            BitWidth::Four => Some(BitWidth::Eight),
            BitWidth::Eight => Some(BitWidth::Sixteen),
            BitWidth::Sixteen => None,
        }
    }
}

/// 4096 fixed-width unsigned entries packed into 32-bit words.
///
/// The backing buffer is sized for the widest layout so that widening never
/// reallocates; it is meant to be reused across encodings via [`reset`].
///
/// [`reset`]: PackedWords::reset
pub struct PackedWords {
    width: BitWidth,
    words: Box<[u32]>,
}

impl PackedWords {
    pub fn new() -> Self {
        Self {
            width: BitWidth::Four,
            words: vec![0u32; BitWidth::Sixteen.word_count()].into_boxed_slice(),
        }
    }

    /// Back to an all-zero 4-bit array.
    pub fn reset(&mut self) {
        self.width = BitWidth::Four;
        self.words.fill(0);
    }

    pub fn width(&self) -> BitWidth {
        self.width
    }

    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        Self::read(&self.words, self.width, index)
    }

    /// Store `value` at `index`. `value` must fit the current width.
    #[inline]
    pub fn set(&mut self, index: usize, value: u32) {
        debug_assert!(value <= self.width.max_value(), "value {value} exceeds {:?}", self.width);
        Self::write(&mut self.words, self.width, index, value);
    }

    /// Widen every entry to `width`, preserving values.
    ///
    /// Runs from the last entry down: entry `i` moves from bit `i * old` to
    /// `i * new >= i * old`, so each write lands on bits whose old contents
    /// have already been read.
    pub fn migrate(&mut self, width: BitWidth) {
        let old = self.width;
        if width <= old {
            return;
        }
        for index in (0..SECTION_VOLUME).rev() {
            let value = Self::read(&self.words, old, index);
            Self::write(&mut self.words, width, index, value);
        }
        self.width = width;
    }

    /// The words making up the current layout.
    pub fn as_words(&self) -> &[u32] {
        &self.words[..self.width.word_count()]
    }

    #[inline]
    fn read(words: &[u32], width: BitWidth, index: usize) -> u32 {
        let bit = index * width.bits() as usize;
        (words[bit >> 5] >> (bit & 31)) & width.max_value()
    }

    #[inline]
    fn write(words: &mut [u32], width: BitWidth, index: usize, value: u32) {
        let bit = index * width.bits() as usize;
        let offset = bit & 31;
        let mask = width.max_value() << offset;
        let word = &mut words[bit >> 5];
        *word = (*word & !mask) | ((value << offset) & mask);
    }
}

impl Default for PackedWords {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_constants() {
        assert_eq!(BitWidth::Four.header(), 9);
        assert_eq!(BitWidth::Eight.header(), 17);
        assert_eq!(BitWidth::Sixteen.header(), 33);
        assert_eq!(BitWidth::Four.word_count(), 512);
        assert_eq!(BitWidth::Eight.word_count(), 1024);
        assert_eq!(BitWidth::Sixteen.word_count(), 2048);
        assert_eq!(BitWidth::Eight.max_value(), 255);
    }

    #[test]
    fn entries_do_not_bleed() {
        let mut words = PackedWords::new();
        words.set(0, 0xF);
        words.set(1, 0x3);
        words.set(7, 0x9);
        assert_eq!(words.get(0), 0xF);
        assert_eq!(words.get(1), 0x3);
        assert_eq!(words.get(2), 0);
        assert_eq!(words.as_words()[0], 0x9000_003F);
    }

    #[test]
    fn migrate_preserves_every_entry() {
        let mut words = PackedWords::new();
        for i in 0..SECTION_VOLUME {
            words.set(i, (i % 16) as u32);
        }
        words.migrate(BitWidth::Eight);
        assert_eq!(words.width(), BitWidth::Eight);
        for i in 0..SECTION_VOLUME {
            assert_eq!(words.get(i), (i % 16) as u32, "entry {i} after 4 -> 8");
            words.set(i, (i % 256) as u32);
        }
        words.migrate(BitWidth::Sixteen);
        for i in 0..SECTION_VOLUME {
            assert_eq!(words.get(i), (i % 256) as u32, "entry {i} after 8 -> 16");
        }
        assert_eq!(words.as_words().len(), 2048);
    }

    #[test]
    fn reset_clears_previous_contents() {
        let mut words = PackedWords::new();
        words.migrate(BitWidth::Sixteen);
        words.set(4095, 60_000);
        words.reset();
        assert_eq!(words.width(), BitWidth::Four);
        assert!(words.as_words().iter().all(|&w| w == 0));
        assert!((0..SECTION_VOLUME).all(|i| words.get(i) == 0));
    }
}
