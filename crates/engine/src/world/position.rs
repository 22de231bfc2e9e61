/// Chunk column position (each column is 16x16 blocks horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Pack both coordinates into one key: x in the high 32 bits, z in the low.
    pub const fn hash(&self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.z as u32 as u64)
    }

    /// Inverse of [`ChunkPos::hash`].
    pub const fn from_hash(hash: u64) -> Self {
        Self {
            x: (hash >> 32) as u32 as i32,
            z: hash as u32 as i32,
        }
    }

    /// The column's region file coordinates (32x32 columns per region).
    pub const fn region(&self) -> (i32, i32) {
        (self.x.div_euclid(32), self.z.div_euclid(32))
    }
}

/// Block position inside one subchunk (each axis in 0..16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Scan index in XZY order: `x << 8 | z << 4 | y`.
    pub const fn index(&self) -> usize {
        ((self.x as usize) << 8) | ((self.z as usize) << 4) | (self.y as usize)
    }

    pub const fn from_index(index: usize) -> Self {
        Self {
            x: ((index >> 8) & 0xF) as u8,
            y: (index & 0xF) as u8,
            z: ((index >> 4) & 0xF) as u8,
        }
    }

    /// True on any outer face of the subchunk.
    pub const fn is_border(&self) -> bool {
        self.x == 0 || self.x == 15 || self.y == 0 || self.y == 15 || self.z == 0 || self.z == 15
    }

    /// The six face-adjacent neighbors. Only valid for non-border cells.
    pub const fn neighbors(&self) -> [LocalPos; 6] {
        [
            Self::new(self.x + 1, self.y, self.z),
            Self::new(self.x - 1, self.y, self.z),
            Self::new(self.x, self.y, self.z + 1),
            Self::new(self.x, self.y, self.z - 1),
            Self::new(self.x, self.y + 1, self.z),
            Self::new(self.x, self.y - 1, self.z),
        ]
    }
}
