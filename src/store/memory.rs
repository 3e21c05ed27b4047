use crate::context::RequestContext;
use crate::error::{OrderError, Result};
use crate::model::{Order, OrderUid};
use crate::store::DurableStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Process-local store. Durable only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<OrderUid, Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-filled with `orders`.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let orders = orders
            .into_iter()
            .map(|order| (order.order_uid.clone(), order))
            .collect();
        Self {
            orders: RwLock::new(orders),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn save(&self, ctx: &RequestContext, order: &Order) -> Result<()> {
        ctx.check()?;
        let mut orders = self.orders.write();
        orders.insert(order.order_uid.clone(), order.clone());
        debug!(order_uid = %order.order_uid, size = orders.len(), "Stored");
        Ok(())
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: &OrderUid) -> Result<Order> {
        ctx.check()?;
        self.orders
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    async fn get_all(&self, ctx: &RequestContext) -> Result<Vec<Order>> {
        ctx.check()?;
        Ok(self.orders.read().values().cloned().collect())
    }
}
