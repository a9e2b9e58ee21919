//! Per-event handlers.
//!
//! Each handler follows the same discipline: resolve configuration and run
//! every fallible computation first (adapter sample, invariant solve, price
//! service call), then perform the entity writes. An error anywhere in the
//! compute phase aborts the event with no persisted change.

use std::sync::Arc;

use log::debug;

use crate::adapters::{self, PoolSample};
use crate::aggregate;
use crate::aggregator;
use crate::config::PoolFamily;
use crate::cross;
use crate::error::EngineError;
use crate::events::{EventKind, LedgerEvent, TwaPayload};
use crate::oracle::decode_cumulative_reserves;
use crate::utils::{amount_to_f64, guarded_div};

use super::worker::Engine;

/// Configuration resolved for one pool reference.
struct PoolContext {
    id: String,
    family: PoolFamily,
    token_count: usize,
    bean_index: usize,
    other_token: String,
    other_decimals: u8,
    other_price: f64,
}

impl Engine {
    /// Apply one ledger event to completion.
    pub fn apply(&mut self, event: &LedgerEvent) -> Result<(), EngineError> {
        let (block, timestamp) = (event.block, event.timestamp);
        let result = match &event.kind {
            EventKind::Swap { pool, to_token, amount_in, amount_out } => {
                self.handle_swap(block, timestamp, pool, to_token, *amount_in, *amount_out)
            }
            EventKind::LiquidityChange { pool, amounts } => {
                self.handle_liquidity_change(block, timestamp, pool, amounts)
            }
            EventKind::ReserveSync { pool, reserves } => {
                self.handle_reserve_sync(block, timestamp, pool, reserves)
            }
            EventKind::TwaUpdate { pool, payload } => {
                self.handle_twa_update(block, timestamp, pool, payload)
            }
            EventKind::Tick => self.handle_tick(block, timestamp),
            EventKind::SupplyChange { delta } => {
                self.handle_supply_change(timestamp, *delta);
                Ok(())
            }
            EventKind::PriceUpdate { token, price_usd } => {
                self.handle_price_update(token, *price_usd)
            }
            EventKind::Dewhitelist { pool } => self.handle_dewhitelist(block, timestamp, pool),
        };
        if result.is_ok() {
            self.last_applied_block = block;
        }
        result
    }

    // ============================================
    // Event Handlers
    // ============================================

    fn handle_swap(
        &mut self,
        block: u64,
        timestamp: u64,
        pool_id: &str,
        to_token: &str,
        amount_in: u128,
        amount_out: u128,
    ) -> Result<(), EngineError> {
        let ctx = self.pool_context(pool_id)?;
        let bean = ctx.bean_index;
        let other = 1 - bean;

        // Reconstruct post-swap reserves from the delta amounts
        let mut reserves = self.current_reserves(pool_id, ctx.token_count);
        if to_token == self.settings.asset.token {
            reserves[bean] = reserves[bean].saturating_sub(amount_out);
            reserves[other] = reserves[other].saturating_add(amount_in);
        } else {
            reserves[bean] = reserves[bean].saturating_add(amount_in);
            reserves[other] = reserves[other].saturating_sub(amount_out);
        }

        let sample = self.compute_sample(&ctx, &reserves, block)?;

        // Trade volume is the pegged-asset leg of the swap
        let volume = if to_token == self.settings.asset.token { amount_out } else { amount_in };

        self.commit_pool_sample(&ctx, block, timestamp, &sample, volume)
    }

    fn handle_liquidity_change(
        &mut self,
        block: u64,
        timestamp: u64,
        pool_id: &str,
        amounts: &[i128],
    ) -> Result<(), EngineError> {
        let ctx = self.pool_context(pool_id)?;

        let mut reserves = self.current_reserves(pool_id, ctx.token_count);
        for (reserve, delta) in reserves.iter_mut().zip(amounts.iter()) {
            if *delta >= 0 {
                *reserve = reserve.saturating_add(*delta as u128);
            } else {
                *reserve = reserve.saturating_sub(delta.unsigned_abs());
            }
        }

        let sample = self.compute_sample(&ctx, &reserves, block)?;
        let volume = self.one_sided_volume(&ctx, amounts, &sample.updated_reserves);

        self.commit_pool_sample(&ctx, block, timestamp, &sample, volume)
    }

    fn handle_reserve_sync(
        &mut self,
        block: u64,
        timestamp: u64,
        pool_id: &str,
        reserves: &[u128],
    ) -> Result<(), EngineError> {
        let ctx = self.pool_context(pool_id)?;
        let sample = self.compute_sample(&ctx, reserves, block)?;
        self.commit_pool_sample(&ctx, block, timestamp, &sample, 0)
    }

    fn handle_twa_update(
        &mut self,
        block: u64,
        timestamp: u64,
        pool_id: &str,
        payload: &TwaPayload,
    ) -> Result<(), EngineError> {
        let ctx = self.pool_context(pool_id)?;
        let settings = Arc::clone(&self.settings);

        // Decode before any state change; malformed buffers are fatal
        let decoded = match payload {
            TwaPayload::Encoded(bytes) => Some(decode_cumulative_reserves(bytes)?),
            _ => None,
        };

        self.store.token_or_create(&settings, &settings.asset.token)?;
        self.store.token_or_create(&settings, &ctx.other_token)?;
        self.store.pool_or_create(&settings, pool_id, block, timestamp)?;

        let twa_reserves = {
            let oracle = self.store.twa_or_create(pool_id, ctx.token_count);
            let cumulative = match payload {
                TwaPayload::Cumulative(counters) => counters.clone(),
                TwaPayload::Reserves(reserves) => oracle.accumulate(reserves, timestamp),
                TwaPayload::Encoded(_) => decoded.unwrap_or_default(),
            };
            oracle.twa_reserves(&cumulative, timestamp)
        };

        // Pump-backed pools are constant-product underneath; only the
        // StableSwap family needs the invariant solve for its TWA
        let twa = match ctx.family {
            PoolFamily::StableSwap => {
                let meta = self.invariants.get(&ctx.id).ok_or_else(|| {
                    EngineError::BadPoolConfig {
                        pool: ctx.id.clone(),
                        reason: "missing invariant metadata".to_string(),
                    }
                })?;
                adapters::stableswap::sample(
                    &twa_reserves,
                    ctx.bean_index,
                    settings.asset.decimals,
                    ctx.other_decimals,
                    meta,
                )?
            }
            _ => adapters::constant_product::sample(
                &twa_reserves,
                ctx.bean_index,
                settings.asset.decimals,
                ctx.other_decimals,
                ctx.other_price,
            ),
        };

        aggregator::update_pool_twa(&mut self.store, pool_id, block, timestamp, twa.price, twa.delta_b)?;
        aggregator::update_asset_twa(&mut self.store, &settings, timestamp);
        Ok(())
    }

    fn handle_tick(&mut self, block: u64, timestamp: u64) -> Result<(), EngineError> {
        if !self.scan.should_process(block) {
            debug!("tick at block {block} skipped by cross-block scan");
            return Ok(());
        }

        let snapshot = self.price_service.snapshot(block)?;

        // Resolve every pool's configuration before the first write
        let mut plans = Vec::with_capacity(snapshot.pools.len());
        for data in &snapshot.pools {
            plans.push((self.pool_context(&data.pool)?, PoolSample::from_service(data)));
        }

        for (ctx, sample) in plans {
            self.commit_pool_sample(&ctx, block, timestamp, &sample, 0)?;
        }
        Ok(())
    }

    fn handle_supply_change(&mut self, timestamp: u64, delta: i128) {
        let settings = Arc::clone(&self.settings);
        aggregator::update_asset_supply(&mut self.store, &settings, timestamp, delta);
    }

    fn handle_price_update(&mut self, token_id: &str, price_usd: f64) -> Result<(), EngineError> {
        let settings = Arc::clone(&self.settings);
        let token = self.store.token_or_create(&settings, token_id)?;
        token.last_price_usd = price_usd;
        Ok(())
    }

    fn handle_dewhitelist(
        &mut self,
        block: u64,
        timestamp: u64,
        pool_id: &str,
    ) -> Result<(), EngineError> {
        let settings = Arc::clone(&self.settings);
        self.store.pool_or_create(&settings, pool_id, block, timestamp)?;

        let asset = self.store.asset_or_create(&settings);
        if let Some(position) = asset.pools.iter().position(|p| p == pool_id) {
            let id = asset.pools.remove(position);
            asset.dewhitelisted_pools.push(id);
        }

        let pool = self.store.pool_mut(pool_id)?;
        pool.whitelisted = false;
        pool.touch(block, timestamp);

        self.refresh_aggregate(block, timestamp, 0, 0.0);
        Ok(())
    }

    // ============================================
    // Shared Plumbing
    // ============================================

    fn pool_context(&self, pool_id: &str) -> Result<PoolContext, EngineError> {
        let cfg = self
            .settings
            .pool(pool_id)
            .ok_or_else(|| EngineError::UnknownPool(pool_id.to_string()))?;
        let bean_index = cfg
            .tokens
            .iter()
            .position(|t| *t == self.settings.asset.token)
            .ok_or_else(|| EngineError::BadPoolConfig {
                pool: pool_id.to_string(),
                reason: "pool does not contain the pegged asset".to_string(),
            })?;
        let other_token = cfg.tokens[1 - bean_index].clone();
        let other = self
            .settings
            .token(&other_token)
            .ok_or_else(|| EngineError::UnknownToken(other_token.clone()))?;
        let other_price = self.store.token_price(&self.settings, &other_token)?;

        Ok(PoolContext {
            id: cfg.id.clone(),
            family: cfg.family,
            token_count: cfg.tokens.len(),
            bean_index,
            other_token,
            other_decimals: other.decimals,
            other_price,
        })
    }

    fn current_reserves(&self, pool_id: &str, token_count: usize) -> Vec<u128> {
        self.store
            .pool(pool_id)
            .map(|p| p.reserves.clone())
            .unwrap_or_else(|| vec![0; token_count])
    }

    fn compute_sample(
        &self,
        ctx: &PoolContext,
        reserves: &[u128],
        block: u64,
    ) -> Result<PoolSample, EngineError> {
        match ctx.family {
            PoolFamily::ConstantProduct => Ok(adapters::constant_product::sample(
                reserves,
                ctx.bean_index,
                self.settings.asset.decimals,
                ctx.other_decimals,
                ctx.other_price,
            )),
            PoolFamily::StableSwap => {
                let meta = self.invariants.get(&ctx.id).ok_or_else(|| {
                    EngineError::BadPoolConfig {
                        pool: ctx.id.clone(),
                        reason: "missing invariant metadata".to_string(),
                    }
                })?;
                adapters::stableswap::sample(
                    reserves,
                    ctx.bean_index,
                    self.settings.asset.decimals,
                    ctx.other_decimals,
                    meta,
                )
            }
            PoolFamily::PumpBacked => {
                adapters::pump::sample(self.price_service.as_ref(), &ctx.id, block)
            }
        }
    }

    /// A liquidity change touching exactly one side counts as trade volume;
    /// the counterparty side converts to pegged units through the reserve
    /// ratio. Two-sided changes move no volume.
    fn one_sided_volume(&self, ctx: &PoolContext, amounts: &[i128], reserves: &[u128]) -> u128 {
        let nonzero = amounts.iter().filter(|a| **a != 0).count();
        if nonzero != 1 {
            return 0;
        }

        let bean = ctx.bean_index;
        let other = 1 - bean;
        if amounts.get(bean).copied().unwrap_or(0) != 0 {
            return amounts[bean].unsigned_abs();
        }

        let decimals = self.settings.asset.decimals;
        let other_amount =
            amount_to_f64(amounts.get(other).copied().unwrap_or(0).unsigned_abs(), ctx.other_decimals);
        let bean_reserve = amount_to_f64(reserves.get(bean).copied().unwrap_or(0), decimals);
        let other_reserve =
            amount_to_f64(reserves.get(other).copied().unwrap_or(0), ctx.other_decimals);
        let pair_rate = guarded_div(bean_reserve, other_reserve);

        (other_amount * pair_rate * 10f64.powi(decimals as i32)).max(0.0) as u128
    }

    /// Write phase shared by the pool handlers: reserves, rollups, price,
    /// cross check, then the whitelist-aware aggregate refresh.
    fn commit_pool_sample(
        &mut self,
        ctx: &PoolContext,
        block: u64,
        timestamp: u64,
        sample: &PoolSample,
        volume: u128,
    ) -> Result<(), EngineError> {
        let settings = Arc::clone(&self.settings);

        self.store.token_or_create(&settings, &settings.asset.token)?;
        self.store.token_or_create(&settings, &ctx.other_token)?;

        let pool = self.store.pool_or_create(&settings, &ctx.id, block, timestamp)?;
        let whitelisted = pool.whitelisted;
        let delta_liquidity_usd = sample.liquidity_usd - pool.liquidity_usd;
        let volume_usd = amount_to_f64(volume, settings.asset.decimals) * sample.price;

        aggregator::set_pool_reserves(&mut self.store, &ctx.id, sample.updated_reserves.clone())?;
        aggregator::update_pool_values(
            &mut self.store,
            &ctx.id,
            block,
            timestamp,
            volume,
            volume_usd,
            delta_liquidity_usd,
            sample.delta_b,
        )?;
        let old_price =
            aggregator::update_pool_price(&mut self.store, &ctx.id, block, timestamp, sample.price)?;
        cross::check_pool_cross(&mut self.store, &ctx.id, block, timestamp, old_price, sample.price)?;

        let (aggregate_volume, aggregate_volume_usd) =
            if whitelisted { (volume, volume_usd) } else { (0, 0.0) };
        self.refresh_aggregate(block, timestamp, aggregate_volume, aggregate_volume_usd);
        Ok(())
    }

    /// Recompute the aggregate from whitelisted pools and run its cross check.
    fn refresh_aggregate(&mut self, block: u64, timestamp: u64, volume: u128, volume_usd: f64) {
        let settings = Arc::clone(&self.settings);
        let old_price = self.store.asset().map(|a| a.price).unwrap_or(0.0);

        let price = aggregate::weighted_price(&self.store);
        let liquidity_usd = aggregate::total_liquidity(&self.store);
        let delta_b = aggregate::total_delta_b(&self.store);

        aggregator::update_asset_values(
            &mut self.store,
            &settings,
            timestamp,
            price,
            volume,
            volume_usd,
            liquidity_usd,
            delta_b,
        );
        cross::check_asset_cross(&mut self.store, &settings, block, timestamp, old_price, price);
    }
}
