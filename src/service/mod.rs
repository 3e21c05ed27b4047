//! # Order Service
//!
//! Cache-aside over a [`DurableStore`] and a [`BoundedCache`].
//!
//! ## Writes
//!
//! The durable store is written first. If that fails the cache is not touched,
//! so the cache never holds an order the store does not. Once the store has
//! accepted the write, a failure to update the cache is logged and swallowed;
//! the stale entry for that uid (if any) is dropped so the next read falls
//! through to the store.
//!
//! ## Reads
//!
//! ```text
//! CacheLookup ── hit ──────────────────────────────▶ return
//!      │
//!     miss
//!      ▼
//! DurableLookup ── hit ──▶ PopulateCache ──────────▶ return
//!      │
//!     miss ────────────────────────────────────────▶ NotFound
//! ```
//!
//! A failed repopulation never turns a successful store read into an error.

use crate::cache::BoundedCache;
use crate::context::RequestContext;
use crate::error::{OrderError, Result};
use crate::model::{Order, OrderUid};
use crate::store::DurableStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What the ingest and serving boundaries need from the core.
///
/// Both boundaries depend on this trait rather than on [`OrderService`]
/// directly, so either can be exercised against a double.
#[async_trait]
pub trait Orders: Send + Sync + 'static {
    async fn save_order(&self, ctx: &RequestContext, order: Order) -> Result<()>;

    async fn get_order_by_id(&self, ctx: &RequestContext, id: &OrderUid) -> Result<Arc<Order>>;
}

pub struct OrderService<S> {
    store: S,
    cache: BoundedCache<OrderUid, Order>,
}

impl<S: DurableStore> OrderService<S> {
    /// Builds a service with an empty cache of the given capacity.
    pub fn new(store: S, capacity: usize) -> Self {
        Self {
            store,
            cache: BoundedCache::new(capacity),
        }
    }

    pub fn cache(&self) -> &BoundedCache<OrderUid, Order> {
        &self.cache
    }

    /// Fills the cache from the durable store, stopping at capacity.
    ///
    /// Returns how many orders were loaded.
    #[instrument(skip_all)]
    pub async fn warm_up(&self, ctx: &RequestContext) -> Result<usize> {
        ctx.check()?;
        let orders = self.store.get_all(ctx).await?;
        let available = orders.len();

        let mut loaded = 0;
        for order in orders.into_iter().take(self.cache.capacity()) {
            let uid = order.order_uid.clone();
            if let Err(e) = self.cache.put(ctx, uid.clone(), Arc::new(order)) {
                if e.is_cancellation() {
                    return Err(e);
                }
                warn!(order_uid = %uid, error = %e, "Skipping order during warm-up");
                continue;
            }
            loaded += 1;
        }
        info!(loaded, available, capacity = self.cache.capacity(), "Cache warmed");
        Ok(loaded)
    }

    /// Persists `order`, then makes it visible in the cache.
    #[instrument(skip(self, ctx, order), fields(order_uid = %order.order_uid))]
    pub async fn save_order(&self, ctx: &RequestContext, order: Order) -> Result<()> {
        ctx.check()?;
        self.store.save(ctx, &order).await?;

        let uid = order.order_uid.clone();
        if let Err(e) = self.cache.put(ctx, uid.clone(), Arc::new(order)) {
            let dropped_stale = self.cache.invalidate(&uid);
            warn!(error = %e, dropped_stale, "Cache write failed after durable save");
        }
        debug!("Order saved");
        Ok(())
    }

    /// Cache first, then the durable store.
    #[instrument(skip(self, ctx))]
    pub async fn get_order_by_id(&self, ctx: &RequestContext, id: &OrderUid) -> Result<Arc<Order>> {
        match self.cache.get(ctx, id) {
            Ok(order) => {
                debug!("Cache hit");
                return Ok(order);
            }
            Err(OrderError::NotFound(_)) => debug!("Cache miss"),
            Err(e) => return Err(e),
        }

        let order = Arc::new(self.store.get_by_id(ctx, id).await?);
        if let Err(e) = self.cache.put(ctx, id.clone(), Arc::clone(&order)) {
            warn!(error = %e, "Cache repopulation failed");
        }
        Ok(order)
    }

    /// Every order in the durable store.
    pub async fn all_orders(&self, ctx: &RequestContext) -> Result<Vec<Order>> {
        self.store.get_all(ctx).await
    }
}

#[async_trait]
impl<S: DurableStore> Orders for OrderService<S> {
    async fn save_order(&self, ctx: &RequestContext, order: Order) -> Result<()> {
        OrderService::save_order(self, ctx, order).await
    }

    async fn get_order_by_id(&self, ctx: &RequestContext, id: &OrderUid) -> Result<Arc<Order>> {
        OrderService::get_order_by_id(self, ctx, id).await
    }
}
