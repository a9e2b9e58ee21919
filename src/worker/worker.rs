use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use log::{error, info, warn};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{InvariantMeta, PoolFamily, Settings};
use crate::events::LedgerEvent;
use crate::price::PriceService;
use crate::scan::CrossBlocks;
use crate::store::Store;

/// Interval for logging progress updates (10 seconds)
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// The derived-state engine.
///
/// Applies one strictly-ordered ledger event at a time, running the full
/// adapter -> aggregator -> cross-detector pipeline to completion before the
/// next event is admitted. Handlers compute every fallible step (service
/// calls, invariant solves, buffer decodes) before the first entity write, so
/// a failed event produces no derived-state change.
pub struct Engine {
    pub(crate) settings: Arc<Settings>,
    pub(crate) invariants: FxHashMap<String, InvariantMeta>,
    pub(crate) scan: CrossBlocks,
    pub(crate) price_service: Box<dyn PriceService>,
    pub(crate) store: Store,
    pub(crate) last_applied_block: u64,
}

impl Engine {
    pub fn new(
        settings: Arc<Settings>,
        price_service: Box<dyn PriceService>,
    ) -> anyhow::Result<Self> {
        let mut invariants = FxHashMap::default();
        for pool in &settings.pools {
            if pool.tokens.len() != 2 {
                bail!("pool {} must hold exactly two tokens", pool.id);
            }
            if !pool.tokens.contains(&settings.asset.token) {
                bail!("pool {} does not contain the pegged asset", pool.id);
            }
            for token in &pool.tokens {
                if *token == settings.asset.token {
                    continue;
                }
                let cfg = settings
                    .token(token)
                    .with_context(|| format!("pool {} references unknown token {token}", pool.id))?;
                if cfg.decimals > 18 {
                    bail!("token {token} has unsupported decimal precision {}", cfg.decimals);
                }
            }
            if pool.family == PoolFamily::StableSwap {
                invariants.insert(pool.id.clone(), pool.invariant_meta()?);
            }
        }

        let scan = CrossBlocks::new(settings.scan.cross_blocks.clone());
        info!(
            "engine configured: {} pools, {} known cross blocks (max {})",
            settings.pools.len(),
            scan.len(),
            scan.max_block()
        );

        Ok(Self {
            settings,
            invariants,
            scan,
            price_service,
            store: Store::new(),
            last_applied_block: 0,
        })
    }

    /// Read access to the derived entities for the downstream query layer.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// Single-consumer event loop around an [`Engine`].
///
/// Events arrive on an mpsc channel already ordered by (block, log index);
/// the worker drains them one at a time, so no interleaving and no internal
/// locking are needed.
pub struct EngineWorker {
    engine: Engine,
    receiver: mpsc::Receiver<LedgerEvent>,
}

impl EngineWorker {
    pub fn new(engine: Engine, receiver: mpsc::Receiver<LedgerEvent>) -> Self {
        Self { engine, receiver }
    }

    /// Drain the channel until it closes or cancellation fires, returning the
    /// engine for final inspection.
    pub async fn run(mut self, cancellation_token: CancellationToken) -> Engine {
        let mut last_progress_log = Instant::now();
        let mut applied = 0u64;
        let mut skipped = 0u64;
        let mut failed = 0u64;

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("engine worker received cancellation signal");
                    break;
                }
                maybe_event = self.receiver.recv() => {
                    let Some(event) = maybe_event else {
                        break;
                    };

                    if event.block < self.engine.last_applied_block {
                        warn!(
                            "event at block {} arrived after block {}; the feed must be ordered",
                            event.block, self.engine.last_applied_block
                        );
                    }

                    match self.engine.apply(&event) {
                        Ok(()) => applied += 1,
                        Err(e) if e.is_recoverable() => {
                            skipped += 1;
                            warn!("event at block {} produced no state change: {e}", event.block);
                        }
                        Err(e) => {
                            failed += 1;
                            error!("fatal error applying event at block {}: {e}", event.block);
                        }
                    }

                    if last_progress_log.elapsed() >= PROGRESS_LOG_INTERVAL {
                        let price = self
                            .engine
                            .store()
                            .asset()
                            .map(|a| a.price)
                            .unwrap_or(0.0);
                        info!(
                            "applied {applied} events (skipped {skipped}, failed {failed}), aggregate price {price:.4}"
                        );
                        last_progress_log = Instant::now();
                    }
                }
            }
        }

        info!("engine worker stopped: {applied} applied, {skipped} skipped, {failed} failed");
        self.engine
    }
}
