//! Chunk request queue and the per-tick dispatch loop.
//!
//! Requests accumulate subscribers per column between ticks. Each tick drains
//! the queue: a still-valid concealed packet in the world's cache is sent as
//! is; anything else is encoded through the concealing encoder, optionally
//! cached, and sent to every subscriber still using the column.
//!
//! The handler owns its encoder scratch and is driven through `&mut self`, so
//! only one column is ever being encoded at a time.

use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use veil_engine::conceal::ConcealmentTable;
use veil_engine::encode::EncodeError;
use veil_engine::registry::BlockRegistry;
use veil_engine::world::position::ChunkPos;
use veil_engine::world::{CachedPacket, StorageFormat};

use crate::config::VeilConfig;
use crate::metrics::Metrics;
use crate::packet::{self, ChunkPacket};
use crate::payload::PayloadBuilder;
use crate::session::ChunkSubscriber;
use crate::source::ChunkSource;

pub type SharedRegistry = Arc<dyn BlockRegistry + Send + Sync>;

/// Subscribers waiting on one column, keyed by loader id.
type Subscribers = IndexMap<u32, Arc<dyn ChunkSubscriber>>;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub prepared: usize,
    pub cache_hits: usize,
    pub fallbacks: usize,
    pub delivered: usize,
    /// Entries kept for the next tick because their column failed to load.
    pub retried: usize,
    /// Entries discarded: unloadable column and nobody left using it.
    pub dropped: usize,
}

/// A chunk request sent to the dispatch task.
pub struct ChunkRequest {
    pub pos: ChunkPos,
    pub subscriber: Arc<dyn ChunkSubscriber>,
}

pub struct WorldHandler {
    source: Arc<dyn ChunkSource>,
    registry: SharedRegistry,
    table: ConcealmentTable,
    builder: PayloadBuilder,
    memory_cache: bool,
    supported: bool,
    queue: IndexMap<u64, Subscribers>,
    metrics: Arc<Metrics>,
}

impl WorldHandler {
    pub fn new(
        source: Arc<dyn ChunkSource>,
        config: &VeilConfig,
        registry: SharedRegistry,
        metrics: Arc<Metrics>,
    ) -> Result<Self, EncodeError> {
        let supported = source.format() == StorageFormat::Anvil && config.is_enabled(source.name());
        if !supported {
            tracing::debug!(
                "World {} ({:?}) is served without concealment",
                source.name(),
                source.format()
            );
        }
        Ok(Self {
            table: config.concealment_table(source.dimension()),
            builder: PayloadBuilder::new(registry.air(), config.section_ceiling())?,
            memory_cache: config.memory_cache,
            supported,
            queue: IndexMap::new(),
            source,
            registry,
            metrics,
        })
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn source(&self) -> &Arc<dyn ChunkSource> {
        &self.source
    }

    /// Number of columns waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_queued(&self, pos: ChunkPos) -> bool {
        self.queue.contains_key(&pos.hash())
    }

    /// Add `subscriber` to the column's pending set. Worlds the handler does
    /// not cover are served immediately through the source's own path.
    pub fn enqueue(&mut self, pos: ChunkPos, subscriber: Arc<dyn ChunkSubscriber>) {
        if !self.supported {
            self.metrics.record_direct_request();
            self.source.request_chunk(pos, subscriber.as_ref());
            return;
        }
        self.queue
            .entry(pos.hash())
            .or_default()
            .insert(subscriber.loader_id(), subscriber);
    }

    /// Flush every queued column.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let queue = mem::take(&mut self.queue);
        for (hash, subscribers) in queue {
            self.flush(ChunkPos::from_hash(hash), subscribers, &mut report);
        }
        report
    }

    fn flush(&mut self, pos: ChunkPos, mut subscribers: Subscribers, report: &mut TickReport) {
        let hash = pos.hash();

        if let Some(data) = self.valid_cached_packet(pos) {
            let packet = ChunkPacket::Batch(data);
            report.cache_hits += 1;
            report.delivered += deliver(pos, &subscribers, &packet);
            self.metrics.record_cache_hit();
            return;
        }

        let Some(column) = self.source.load_column(pos) else {
            tracing::warn!("Invalid chunk set ({}|{},{})", self.source.name(), pos.x, pos.z);
            self.metrics.record_load_failure();
            subscribers.retain(|_, s| s.is_using_chunk(hash));
            if subscribers.is_empty() {
                report.dropped += 1;
            } else {
                report.retried += 1;
                let pending = self.queue.entry(hash).or_default();
                for (id, subscriber) in subscribers {
                    pending.entry(id).or_insert(subscriber);
                }
            }
            return;
        };

        let loaded_changes = column.changes();
        let started = Instant::now();
        let prepared = match self.builder.build(&column, &self.table, &*self.registry) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!("Failed to build chunk ({}, {}): {}", pos.x, pos.z, e);
                report.dropped += 1;
                return;
            }
        };
        self.metrics.record_prepare(started.elapsed(), prepared.fallback);
        report.prepared += 1;
        if prepared.fallback {
            report.fallbacks += 1;
        }

        let packet = if self.memory_cache {
            match packet::batch_level_chunk(pos, &prepared.payload) {
                Ok(data) => {
                    self.store_if_fresh(pos, loaded_changes, !prepared.fallback, &data);
                    ChunkPacket::Batch(data)
                }
                Err(e) => {
                    tracing::debug!("Batching chunk ({}, {}) failed: {}", pos.x, pos.z, e);
                    ChunkPacket::Payload(prepared.payload)
                }
            }
        } else {
            ChunkPacket::Payload(prepared.payload)
        };

        let delivered = deliver(pos, &subscribers, &packet);
        self.metrics.record_deliveries(delivered as u64);
        report.delivered += delivered;
    }

    /// Cached packet that this encoder produced from the column as it is now.
    fn valid_cached_packet(&self, pos: ChunkPos) -> Option<Arc<[u8]>> {
        let cached = self.source.cached_packet(pos)?;
        let live = self.source.changes(pos)?;
        (cached.concealed && cached.changes == live).then_some(cached.data)
    }

    /// Cache only if the column has not moved past the snapshot we encoded.
    fn store_if_fresh(&self, pos: ChunkPos, loaded_changes: u64, concealed: bool, data: &Arc<[u8]>) {
        match self.source.changes(pos) {
            Some(live) if live <= loaded_changes => self.source.set_cached_packet(
                pos,
                CachedPacket {
                    changes: loaded_changes,
                    concealed,
                    data: Arc::clone(data),
                },
            ),
            _ => tracing::trace!("Chunk ({}, {}) changed while encoding, not cached", pos.x, pos.z),
        }
    }
}

/// Send to every subscriber still using the column; returns how many got it.
fn deliver(pos: ChunkPos, subscribers: &Subscribers, packet: &ChunkPacket) -> usize {
    let hash = pos.hash();
    let mut delivered = 0;
    for subscriber in subscribers.values() {
        if subscriber.is_using_chunk(hash) {
            subscriber.send_chunk(pos, packet);
            delivered += 1;
        }
    }
    delivered
}

/// Drive `handler` until the request channel closes.
///
/// Requests and ticks are handled in the same task, so enqueueing never
/// overlaps a flush.
pub async fn run(
    mut handler: WorldHandler,
    mut requests: mpsc::UnboundedReceiver<ChunkRequest>,
    tick_interval: Duration,
) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = handler.tick();
                if report.prepared > 0 || report.cache_hits > 0 {
                    tracing::debug!(
                        "Dispatched {} prepared / {} cached columns to {} subscribers",
                        report.prepared,
                        report.cache_hits,
                        report.delivered,
                    );
                }
            }
            request = requests.recv() => match request {
                Some(ChunkRequest { pos, subscriber }) => handler.enqueue(pos, subscriber),
                None => break,
            },
        }
    }
    let report = handler.tick();
    tracing::info!(
        "Dispatch loop for {} stopped ({} columns flushed on exit, {} still pending)",
        handler.source().name(),
        report.prepared + report.cache_hits,
        handler.pending(),
    );
}
