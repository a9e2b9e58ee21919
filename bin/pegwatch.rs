use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use pegwatch::{
    utils::signed_to_f64, Engine, EngineWorker, LedgerEvent, Settings, TablePriceService,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );

    let replay = settings
        .replay
        .clone()
        .context("config.yaml needs a replay section (events_path) to run the binary")?;

    let price_service = match &replay.price_table_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read price table {path}"))?;
            let service = TablePriceService::from_json(&json)
                .with_context(|| format!("Failed to parse price table {path}"))?;
            info!("price table loaded: {} blocks", service.len());
            service
        }
        None => TablePriceService::default(),
    };

    let engine = Engine::new(settings.clone(), Box::new(price_service))
        .context("Failed to build engine from configuration")?;

    let (event_tx, event_rx) = mpsc::channel::<LedgerEvent>(1_024);
    let cancellation_token = CancellationToken::new();

    let worker = EngineWorker::new(engine, event_rx);
    let worker_handle = tokio::spawn(worker.run(cancellation_token.child_token()));

    // Feed the ordered event file into the worker channel
    let events_path = replay.events_path.clone();
    let feeder_handle = tokio::spawn(async move {
        let contents = match std::fs::read_to_string(&events_path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read event file {events_path}: {e}");
                return;
            }
        };

        let mut sent = 0usize;
        for (line_number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEvent>(line) {
                Ok(event) => {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                    sent += 1;
                }
                Err(e) => {
                    warn!("Skipping malformed event at line {}: {e}", line_number + 1);
                }
            }
        }
        info!("event feed complete: {sent} events sent");
    });

    // Run until the feed drains or a shutdown signal arrives
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            cancellation_token.cancel();
        },
        _ = feeder_handle => {}
    }

    let engine = worker_handle.await.context("Engine worker panicked")?;

    // Final derived state for the operator
    let store = engine.store();
    if let Some(asset) = store.asset() {
        info!(
            "{}: price {:.4}, liquidity ${:.2}, deltaB {:.2}, supply {}, {} crosses",
            asset.id,
            asset.price,
            asset.liquidity_usd,
            signed_to_f64(asset.delta_b, asset.decimals),
            asset.supply,
            asset.crosses
        );
        for pool_id in asset.pools.iter().chain(asset.dewhitelisted_pools.iter()) {
            if let Some(pool) = store.pool(pool_id) {
                info!(
                    "  pool {}: price {:.4}, liquidity ${:.2}, deltaB {:.2}, {} crosses",
                    pool.id,
                    pool.last_price,
                    pool.liquidity_usd,
                    signed_to_f64(pool.delta_b, asset.decimals),
                    pool.crosses
                );
            }
        }
    } else {
        info!("no events referenced the tracked asset; nothing derived");
    }

    Ok(())
}
