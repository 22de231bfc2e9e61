//! Chunk subscribers and the registry of connected sessions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use uuid::Uuid;
use veil_engine::world::position::ChunkPos;

use crate::packet::ChunkPacket;

/// Anything that asked for columns and wants the packets.
///
/// `is_using_chunk` is re-checked right before delivery, so a subscriber that
/// moved away between request and dispatch gets nothing.
pub trait ChunkSubscriber: Send + Sync {
    fn loader_id(&self) -> u32;
    fn is_using_chunk(&self, hash: u64) -> bool;
    fn send_chunk(&self, pos: ChunkPos, packet: &ChunkPacket);
}

/// One packet on its way to a session's connection task.
#[derive(Debug, Clone)]
pub struct ChunkDelivery {
    pub pos: ChunkPos,
    pub packet: ChunkPacket,
}

/// A connected player, as far as chunk streaming is concerned.
pub struct Session {
    loader_id: u32,
    name: String,
    uuid: Uuid,
    used_chunks: RwLock<HashSet<u64>>,
    tx: mpsc::UnboundedSender<ChunkDelivery>,
}

impl Session {
    pub fn new(loader_id: u32, name: impl Into<String>, tx: mpsc::UnboundedSender<ChunkDelivery>) -> Self {
        let name = name.into();
        Self {
            loader_id,
            uuid: offline_uuid(&name),
            name,
            used_chunks: RwLock::new(HashSet::new()),
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn use_chunk(&self, pos: ChunkPos) {
        self.used_chunks
            .write()
            .expect("session chunks poisoned")
            .insert(pos.hash());
    }

    pub fn release_chunk(&self, pos: ChunkPos) {
        self.used_chunks
            .write()
            .expect("session chunks poisoned")
            .remove(&pos.hash());
    }

    /// Mark every column within `radius` of `center` as in use and return them,
    /// nearest first.
    pub fn view_chunks(&self, center: ChunkPos, radius: i32) -> Vec<ChunkPos> {
        let mut chunks: Vec<ChunkPos> = (-radius..=radius)
            .flat_map(|dx| (-radius..=radius).map(move |dz| (dx, dz)))
            .filter(|(dx, dz)| dx * dx + dz * dz <= radius * radius)
            .map(|(dx, dz)| ChunkPos::new(center.x + dx, center.z + dz))
            .collect();
        chunks.sort_by_key(|c| {
            let (dx, dz) = (c.x - center.x, c.z - center.z);
            dx * dx + dz * dz
        });
        let mut used = self.used_chunks.write().expect("session chunks poisoned");
        used.extend(chunks.iter().map(ChunkPos::hash));
        chunks
    }

    pub fn used_chunk_count(&self) -> usize {
        self.used_chunks.read().expect("session chunks poisoned").len()
    }
}

impl ChunkSubscriber for Session {
    fn loader_id(&self) -> u32 {
        self.loader_id
    }

    fn is_using_chunk(&self, hash: u64) -> bool {
        self.used_chunks
            .read()
            .expect("session chunks poisoned")
            .contains(&hash)
    }

    fn send_chunk(&self, pos: ChunkPos, packet: &ChunkPacket) {
        let delivery = ChunkDelivery { pos, packet: packet.clone() };
        if self.tx.send(delivery).is_err() {
            tracing::trace!("Session {} closed, dropping chunk ({}, {})", self.name, pos.x, pos.z);
        }
    }
}

/// UUID an offline-mode server assigns to `name`.
pub fn offline_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_OID, format!("OfflinePlayer:{name}").as_bytes())
}

/// Thread-safe registry of connected sessions.
///
/// Uses `std::sync::RwLock` because every operation is brief and never held
/// across an await.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<u32, Arc<Session>>>,
    next_loader_id: AtomicU32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_loader_id: AtomicU32::new(1),
        }
    }

    /// Register a new session and hand back the receiving end of its packets.
    pub fn connect(&self, name: &str) -> (Arc<Session>, mpsc::UnboundedReceiver<ChunkDelivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let loader_id = self.next_loader_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session::new(loader_id, name, tx));
        self.sessions
            .write()
            .expect("session registry poisoned")
            .insert(loader_id, Arc::clone(&session));
        tracing::info!("{} connected as loader {} ({})", name, loader_id, session.uuid());
        (session, rx)
    }

    pub fn disconnect(&self, loader_id: u32) -> Option<Arc<Session>> {
        let removed = self
            .sessions
            .write()
            .expect("session registry poisoned")
            .remove(&loader_id);
        if let Some(session) = &removed {
            tracing::info!("{} disconnected", session.name());
        }
        removed
    }

    pub fn get(&self, loader_id: u32) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .get(&loader_id)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().expect("session registry poisoned").len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ChunkPayload;

    #[test]
    fn loader_ids_are_unique() {
        let registry = SessionRegistry::new();
        let (a, _rx_a) = registry.connect("alice");
        let (b, _rx_b) = registry.connect("bob");
        assert_ne!(a.loader_id(), b.loader_id());
        assert_eq!(registry.session_count(), 2);
        assert!(registry.disconnect(a.loader_id()).is_some());
        assert!(registry.get(a.loader_id()).is_none());
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn offline_uuid_is_stable_v3() {
        let uuid = offline_uuid("Steve");
        assert_eq!(uuid, offline_uuid("Steve"));
        assert_eq!(uuid.get_version_num(), 3);
        assert_ne!(uuid, offline_uuid("Alex"));
    }

    #[test]
    fn view_marks_chunks_in_use() {
        let registry = SessionRegistry::new();
        let (session, _rx) = registry.connect("alice");
        let chunks = session.view_chunks(ChunkPos::new(5, -5), 1);
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0], ChunkPos::new(5, -5));
        assert!(session.is_using_chunk(ChunkPos::new(6, -5).hash()));
        assert!(!session.is_using_chunk(ChunkPos::new(6, -4).hash()));

        session.release_chunk(ChunkPos::new(6, -5));
        assert_eq!(session.used_chunk_count(), 4);
    }

    #[test]
    fn send_reaches_receiver() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.connect("alice");
        let packet = ChunkPacket::Payload(ChunkPayload { sub_chunk_count: 0, data: Arc::from(Vec::new()) });
        session.send_chunk(ChunkPos::new(1, 2), &packet);
        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.pos, ChunkPos::new(1, 2));
        assert_eq!(delivery.packet, packet);
    }
}
