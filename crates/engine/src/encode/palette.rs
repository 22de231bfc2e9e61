use crate::world::block::RuntimeId;

use super::EncodeError;
use super::words::PackedWords;

/// Builds one subchunk's palette: unique runtime ids in first-seen order,
/// air pinned at index 0.
///
/// When a new entry no longer fits the word array's width, the array is
/// widened before the index is handed out.
pub struct PaletteBuilder {
    entries: Vec<RuntimeId>,
}

impl PaletteBuilder {
    pub fn new(air: RuntimeId) -> Self {
        let mut entries = Vec::with_capacity(16);
        entries.push(air);
        Self { entries }
    }

    /// Palette index of `id`, appending it (and widening `words`) if new.
    pub fn intern(&mut self, id: RuntimeId, words: &mut PackedWords) -> Result<u32, EncodeError> {
        if let Some(index) = self.entries.iter().position(|&e| e == id) {
            return Ok(index as u32);
        }
        let index = self.entries.len() as u32;
        if index > words.width().max_value() {
            let wider = words
                .width()
                .next()
                .ok_or(EncodeError::PaletteOverflow(self.entries.len()))?;
            words.migrate(wider);
        }
        self.entries.push(id);
        Ok(index)
    }

    pub fn entries(&self) -> &[RuntimeId] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
