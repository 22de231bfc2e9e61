/// Base block type identifier (legacy numeric id: 0 = air, 1 = stone, ...).
///
/// The engine stores these without interpreting them beyond `AIR`. Which ids
/// hide their neighbors or carry value is decided by a `ConcealmentTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The universal "empty" block.
    pub const AIR: BlockId = BlockId(0);
    /// Highest id the one-byte raw subchunk form can carry.
    pub const MAX_LEGACY: BlockId = BlockId(0xFF);
}

/// A fully specified block variant: base type plus auxiliary data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockState {
    pub id: BlockId,
    pub aux: u16,
}

impl BlockState {
    pub const AIR: BlockState = BlockState::of(BlockId::AIR, 0);

    pub const fn of(id: BlockId, aux: u16) -> Self {
        Self { id, aux }
    }

    /// The default variant (aux 0) of a block type.
    pub const fn plain(id: BlockId) -> Self {
        Self { id, aux: 0 }
    }

    pub const fn is_air(&self) -> bool {
        self.id.0 == BlockId::AIR.0
    }

    /// Whether the raw form stores this state without loss: an id byte and
    /// an aux nibble.
    pub const fn is_legacy(&self) -> bool {
        self.id.0 <= BlockId::MAX_LEGACY.0 && self.aux <= 0xF
    }
}

impl From<BlockId> for BlockState {
    fn from(id: BlockId) -> Self {
        Self::plain(id)
    }
}

/// Dense wire identifier for a `BlockState`. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeId(pub u32);
