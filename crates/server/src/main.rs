use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use veil_engine::world::position::ChunkPos;
use veil_server::config::VeilConfig;
use veil_server::dispatch::{self, ChunkRequest, SharedRegistry, WorldHandler};
use veil_server::generate;
use veil_server::metrics::Metrics;
use veil_server::packet::ChunkPacket;
use veil_server::persistence;
use veil_server::registry;
use veil_server::session::SessionRegistry;
use veil_server::source::WorldSource;

/// Radius, in columns, of the generated world when nothing is on disk.
const DEMO_WORLD_RADIUS: i32 = 8;
const DEMO_WORLD_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

#[tokio::main]
async fn main() -> Result<()> {
    let demo_mode = std::env::args().any(|a| a == "--demo");
    let config_path: PathBuf = std::env::args()
        .skip_while(|a| a != "--config")
        .nth(1)
        .unwrap_or_else(|| "veil.json".into())
        .into();
    let world_dir: PathBuf = std::env::args()
        .skip_while(|a| a != "--world")
        .nth(1)
        .unwrap_or_else(|| "world".into())
        .into();
    let view_distance: i32 = std::env::args()
        .skip_while(|a| a != "--view-distance")
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Veil -- ore-concealing chunk server");

    let config = VeilConfig::load(&config_path)?;
    let registry: SharedRegistry =
        Arc::new(registry::load_runtime_table(config.runtime_table.as_deref())?);

    let world_name = world_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("world")
        .to_string();
    let world = match persistence::load_world(&world_dir, &world_name, 0) {
        Ok(Some(world)) => world,
        Ok(None) => {
            tracing::info!("No saved world in {}, generating ore world...", world_dir.display());
            generate::ore_world(&world_name, DEMO_WORLD_RADIUS, DEMO_WORLD_SEED)
        }
        Err(e) => {
            tracing::error!("Failed to load world: {:#}", e);
            generate::ore_world(&world_name, DEMO_WORLD_RADIUS, DEMO_WORLD_SEED)
        }
    };
    let world = Arc::new(world);
    tracing::info!("World {} ready: {} chunks", world.name(), world.chunk_count());

    let metrics = Arc::new(Metrics::new());
    let source = Arc::new(WorldSource::new(Arc::clone(&world), registry.air())?);
    let handler = WorldHandler::new(source, &config, registry, Arc::clone(&metrics))?;
    tracing::info!(
        "Concealment {} for {} (ceiling subchunk {}, {} mode)",
        if handler.is_supported() { "enabled" } else { "disabled" },
        world.name(),
        config.section_ceiling(),
        if config.obfuscator_mode { "rotating" } else { "fixed" },
    );

    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let dispatcher = tokio::spawn(dispatch::run(handler, request_rx, config.tick_interval()));

    let sessions = SessionRegistry::new();
    if demo_mode {
        let (session, mut deliveries) = sessions.connect("demo");
        for pos in session.view_chunks(ChunkPos::new(0, 0), view_distance) {
            let request = ChunkRequest { pos, subscriber: session.clone() };
            if request_tx.send(request).is_err() {
                break;
            }
        }
        tokio::spawn(async move {
            let mut received = 0usize;
            while let Some(delivery) = deliveries.recv().await {
                received += 1;
                let bytes = match &delivery.packet {
                    ChunkPacket::Batch(data) => data.len(),
                    ChunkPacket::Payload(payload) => payload.data.len(),
                };
                tracing::info!(
                    "demo received chunk ({}, {}): {} bytes [{} total]",
                    delivery.pos.x,
                    delivery.pos.z,
                    bytes,
                    received,
                );
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl+C received, shutting down...");

    drop(request_tx);
    if let Err(e) = dispatcher.await {
        tracing::error!("Dispatch task failed: {}", e);
    }

    let snapshot = metrics.snapshot();
    tracing::info!("Dispatch metrics: {}", serde_json::to_string(&snapshot)?);

    tracing::info!("Saving world before exit...");
    match persistence::save_world(&world, &world_dir) {
        Ok(n) => tracing::info!("Shutdown save complete: {} chunks written", n),
        Err(e) => tracing::error!("Shutdown save failed: {:#}", e),
    }
    Ok(())
}
