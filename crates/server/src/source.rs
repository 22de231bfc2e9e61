//! Where the dispatch loop gets its columns from.

use std::sync::{Arc, Mutex};

use veil_engine::encode::EncodeError;
use veil_engine::world::block::RuntimeId;
use veil_engine::world::chunk::ChunkColumn;
use veil_engine::world::position::ChunkPos;
use veil_engine::world::{CachedPacket, StorageFormat, World};

use crate::packet::ChunkPacket;
use crate::payload::PayloadBuilder;
use crate::session::ChunkSubscriber;

/// A world as seen by the chunk dispatch loop.
///
/// `load_column` returns a snapshot; `changes` reads the live counter so a
/// packet built from an older snapshot can be recognized as stale.
pub trait ChunkSource: Send + Sync {
    fn name(&self) -> &str;
    fn dimension(&self) -> u8;
    fn format(&self) -> StorageFormat;
    fn load_column(&self, pos: ChunkPos) -> Option<Arc<ChunkColumn>>;
    fn changes(&self, pos: ChunkPos) -> Option<u64>;
    fn cached_packet(&self, pos: ChunkPos) -> Option<CachedPacket>;
    fn set_cached_packet(&self, pos: ChunkPos, packet: CachedPacket);

    /// Serve a column through the world's own path, without concealment.
    fn request_chunk(&self, pos: ChunkPos, subscriber: &dyn ChunkSubscriber);
}

/// [`ChunkSource`] over an in-memory [`World`].
pub struct WorldSource {
    world: Arc<World>,
    direct: Mutex<PayloadBuilder>,
}

impl WorldSource {
    pub fn new(world: Arc<World>, air: RuntimeId) -> Result<Self, EncodeError> {
        Ok(Self {
            world,
            direct: Mutex::new(PayloadBuilder::new(air, 0)?),
        })
    }
}

impl ChunkSource for WorldSource {
    fn name(&self) -> &str {
        self.world.name()
    }

    fn dimension(&self) -> u8 {
        self.world.dimension()
    }

    fn format(&self) -> StorageFormat {
        self.world.format()
    }

    fn load_column(&self, pos: ChunkPos) -> Option<Arc<ChunkColumn>> {
        self.world.get_chunk(pos)
    }

    fn changes(&self, pos: ChunkPos) -> Option<u64> {
        self.world.changes(pos)
    }

    fn cached_packet(&self, pos: ChunkPos) -> Option<CachedPacket> {
        self.world.cached_packet(pos)
    }

    fn set_cached_packet(&self, pos: ChunkPos, packet: CachedPacket) {
        self.world.set_cached_packet(pos, packet);
    }

    fn request_chunk(&self, pos: ChunkPos, subscriber: &dyn ChunkSubscriber) {
        let Some(column) = self.world.get_chunk(pos) else {
            tracing::debug!("Direct request for unloaded chunk ({}, {})", pos.x, pos.z);
            return;
        };
        let built = self
            .direct
            .lock()
            .expect("direct builder poisoned")
            .build_raw(&column);
        match built {
            Ok(payload) => {
                if subscriber.is_using_chunk(pos.hash()) {
                    subscriber.send_chunk(pos, &ChunkPacket::Payload(payload));
                }
            }
            Err(e) => tracing::warn!("Failed to serialize chunk ({}, {}): {}", pos.x, pos.z, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block;
    use crate::session::SessionRegistry;
    use veil_engine::world::block::BlockState;

    #[test]
    fn direct_request_sends_raw_payload() {
        let world = Arc::new(World::new("flat", 0, StorageFormat::LevelDb));
        world.set_block(0, 0, 0, BlockState::plain(block::DIAMOND_ORE));
        let source = WorldSource::new(Arc::clone(&world), RuntimeId(0)).unwrap();

        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.connect("alice");
        let pos = ChunkPos::new(0, 0);
        session.use_chunk(pos);
        source.request_chunk(pos, session.as_ref());

        let delivery = rx.try_recv().unwrap();
        let ChunkPacket::Payload(payload) = delivery.packet else {
            panic!("direct path sends bare payloads");
        };
        assert_eq!(payload.sub_chunk_count, 1);
        // raw legacy section: version byte then block ids
        assert_eq!(payload.data[0], 0);
        assert_eq!(payload.data[1], block::DIAMOND_ORE.0 as u8);
    }

    #[test]
    fn direct_request_skips_unused_chunk() {
        let world = Arc::new(World::new("flat", 0, StorageFormat::LevelDb));
        world.set_block(0, 0, 0, BlockState::plain(block::STONE));
        let source = WorldSource::new(world, RuntimeId(0)).unwrap();

        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.connect("alice");
        source.request_chunk(ChunkPos::new(0, 0), session.as_ref());
        assert!(rx.try_recv().is_err());
    }
}
