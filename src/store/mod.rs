//! # Durable Store
//!
//! The authoritative, persistent side of the cache-aside pair. The core only
//! talks to it through the [`DurableStore`] trait; implementations own their
//! own schema and resource scoping.
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: process-local map, for embedding and tests.
//! - [`FileStore`]: one JSON document per order in a directory.
//! - [`mock::MockStore`]: expectation-driven double for asserting which store
//!   calls the service makes.
//!
//! All implementations upsert on `save`: a later save of the same uid replaces
//! the whole aggregate, items included.

pub mod file;
pub mod memory;
pub mod mock;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::context::RequestContext;
use crate::error::{OrderError, Result};
use crate::model::{Order, OrderUid};
use async_trait::async_trait;
use std::sync::Arc;

/// Contract the service consumes from the durable side.
#[async_trait]
pub trait DurableStore: Send + Sync + 'static {
    /// Persists `order`, replacing any previous version with the same uid.
    async fn save(&self, ctx: &RequestContext, order: &Order) -> Result<()>;

    /// Loads one order. Fails with [`OrderError::NotFound`] when absent.
    async fn get_by_id(&self, ctx: &RequestContext, id: &OrderUid) -> Result<Order>;

    /// Loads every stored order.
    async fn get_all(&self, ctx: &RequestContext) -> Result<Vec<Order>>;
}

#[async_trait]
impl<S: DurableStore + ?Sized> DurableStore for Arc<S> {
    async fn save(&self, ctx: &RequestContext, order: &Order) -> Result<()> {
        (**self).save(ctx, order).await
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: &OrderUid) -> Result<Order> {
        (**self).get_by_id(ctx, id).await
    }

    async fn get_all(&self, ctx: &RequestContext) -> Result<Vec<Order>> {
        (**self).get_all(ctx).await
    }
}

/// Failures inside a store implementation, before they reach the core.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for OrderError {
    fn from(e: StoreError) -> Self {
        OrderError::Storage(Box::new(e))
    }
}
