//! # Ingest
//!
//! Pulls raw order payloads from a [`MessageSource`], decodes and validates
//! them, and hands each valid order to [`Orders::save_order`].
//!
//! ## Failure policy
//!
//! A bad message (undecodable, invalid, or rejected by the store) is logged at
//! `warn` and skipped; the worker keeps going. Only a fatal source error ends
//! the worker with an error. Cancellation is observed between messages: a
//! message that has started processing is finished first.
//!
//! ```text
//! recv ──▶ decode ──▶ validate ──▶ save_order
//!   │         │           │            │
//!   │         └───────────┴────────────┴──▶ warn, next message
//!   └── fatal ──▶ IngestError::Source
//! ```

pub mod source;
pub mod validate;

pub use source::{ChannelSource, LineSource};
pub use validate::{OrderValidator, ValidationError};

use crate::context::RequestContext;
use crate::error::OrderError;
use crate::model::{Order, OrderUid};
use crate::service::Orders;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delivers one raw payload per call.
#[async_trait]
pub trait MessageSource: Send {
    async fn recv(&mut self) -> Result<Vec<u8>, SourceError>;
}

#[async_trait]
impl<M: MessageSource + ?Sized> MessageSource for Box<M> {
    async fn recv(&mut self) -> Result<Vec<u8>, SourceError> {
        (**self).recv().await
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// No more messages will ever arrive.
    #[error("Message source exhausted")]
    Exhausted,

    /// The source is broken.
    #[error("Message source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One message could not be read; the next one may be fine.
    #[error("Unreadable message: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Whether the worker must stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SourceError::Malformed(_))
    }
}

/// Why a single message, or the whole worker, failed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to decode order: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid order: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Failed to save order: {0}")]
    Save(#[from] OrderError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Counters kept over the worker's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub saved: u64,
    pub rejected: u64,
}

pub struct IngestWorker<M> {
    source: M,
    orders: Arc<dyn Orders>,
    validator: OrderValidator,
    stats: IngestStats,
}

impl<M: MessageSource> IngestWorker<M> {
    pub fn new(source: M, orders: Arc<dyn Orders>, validator: OrderValidator) -> Self {
        Self {
            source,
            orders,
            validator,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Consumes messages until `token` is cancelled or the source fails fatally.
    ///
    /// Returns `Ok` on cancellation.
    pub async fn run(mut self, token: CancellationToken) -> Result<IngestStats, IngestError> {
        info!("Ingest worker started");
        loop {
            let payload = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                received = self.source.recv() => received,
            };

            match payload {
                Ok(bytes) => {
                    let ctx = RequestContext::background();
                    if let Err(e) = self.process(&ctx, &bytes).await {
                        warn!(error = %e, "Dropping message");
                    }
                }
                Err(e) if e.is_fatal() => {
                    warn!(error = %e, stats = ?self.stats, "Ingest worker stopping");
                    return Err(e.into());
                }
                Err(e) => {
                    self.stats.rejected += 1;
                    warn!(error = %e, "Skipping unreadable message");
                }
            }
        }
        info!(stats = ?self.stats, "Ingest worker stopped");
        Ok(self.stats)
    }

    /// Decodes, validates and saves one payload.
    pub async fn process(&mut self, ctx: &RequestContext, payload: &[u8]) -> Result<OrderUid, IngestError> {
        self.stats.received += 1;
        match decode_and_save(&self.validator, self.orders.as_ref(), ctx, payload).await {
            Ok(uid) => {
                self.stats.saved += 1;
                info!(order_uid = %uid, "Order ingested");
                Ok(uid)
            }
            Err(e) => {
                self.stats.rejected += 1;
                Err(e)
            }
        }
    }

}

// Takes the worker's fields rather than `&self`: the source must not be
// borrowed across the save, or `run` would need `M: Sync` to be `Send`.
async fn decode_and_save(
    validator: &OrderValidator,
    orders: &dyn Orders,
    ctx: &RequestContext,
    payload: &[u8],
) -> Result<OrderUid, IngestError> {
    let order: Order = serde_json::from_slice(payload)?;
    debug!(?order, "Message decoded");
    validator.validate(&order)?;

    let uid = order.order_uid.clone();
    orders.save_order(ctx, order).await?;
    Ok(uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::sample_order;
    use crate::service::OrderService;
    use crate::store::MemoryStore;

    fn worker<M: MessageSource>(source: M) -> (IngestWorker<M>, Arc<OrderService<Arc<MemoryStore>>>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(OrderService::new(Arc::clone(&store), 16));
        let worker = IngestWorker::new(source, service.clone(), OrderValidator::new());
        (worker, service, store)
    }

    fn payload(order: &Order) -> Vec<u8> {
        serde_json::to_vec(order).unwrap()
    }

    #[tokio::test]
    async fn test_valid_message_is_saved() {
        let (_tx, source) = ChannelSource::new(1);
        let (mut worker, service, store) = worker(source);

        let ctx = RequestContext::background();
        let uid = worker.process(&ctx, &payload(&sample_order("o1"))).await.unwrap();

        assert_eq!(uid.as_str(), "o1");
        assert_eq!(store.len(), 1);
        assert!(service.cache().contains("o1"));
    }

    #[tokio::test]
    async fn test_bad_messages_are_rejected_without_side_effects() {
        let (_tx, source) = ChannelSource::new(1);
        let (mut worker, _service, store) = worker(source);
        let ctx = RequestContext::background();

        let err = worker.process(&ctx, b"not json").await.unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));

        let mut json = serde_json::to_value(sample_order("o2")).unwrap();
        json["unexpected"] = serde_json::Value::from(1);
        let err = worker
            .process(&ctx, &serde_json::to_vec(&json).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));

        let mut invalid = sample_order("o3");
        invalid.items.clear();
        let err = worker.process(&ctx, &payload(&invalid)).await.unwrap_err();
        assert!(matches!(err, IngestError::Invalid(_)));

        assert!(store.is_empty());
        assert_eq!(
            worker.stats(),
            IngestStats {
                received: 3,
                saved: 0,
                rejected: 3
            }
        );
    }

    #[tokio::test]
    async fn test_run_continues_past_bad_messages_and_fails_on_exhaustion() {
        let (tx, source) = ChannelSource::new(8);
        let (worker, _service, store) = worker(source);

        tx.send(b"garbage".to_vec()).await.unwrap();
        tx.send(payload(&sample_order("o1"))).await.unwrap();
        tx.send(payload(&sample_order("o2"))).await.unwrap();
        drop(tx);

        let err = worker.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, IngestError::Source(SourceError::Exhausted)));
        assert_eq!(store.len(), 2);
    }

    /// A source that is `Send` but not `Sync`, like a boxed trait object.
    struct SendOnly {
        pending: std::cell::Cell<Option<Vec<u8>>>,
    }

    #[async_trait]
    impl MessageSource for SendOnly {
        async fn recv(&mut self) -> Result<Vec<u8>, SourceError> {
            self.pending.take().ok_or(SourceError::Exhausted)
        }
    }

    fn assert_send<T: Send>(value: T) -> T {
        value
    }

    #[tokio::test]
    async fn test_run_is_send_for_non_sync_sources() {
        let source = SendOnly {
            pending: std::cell::Cell::new(Some(payload(&sample_order("o1")))),
        };
        let (ingest, _service, store) = worker(source);

        let run = assert_send(ingest.run(CancellationToken::new()));
        let err = tokio::spawn(run).await.unwrap().unwrap_err();
        assert!(matches!(err, IngestError::Source(SourceError::Exhausted)));
        assert_eq!(store.len(), 1);

        let boxed: Box<dyn MessageSource> = Box::new(SendOnly {
            pending: std::cell::Cell::new(None),
        });
        let (ingest, _service, _store) = worker(boxed);
        let _run = assert_send(ingest.run(CancellationToken::new()));
    }

    #[tokio::test]
    async fn test_cancellation_ends_run_cleanly() {
        let (_tx, source) = ChannelSource::new(1);
        let (worker, _service, _store) = worker(source);
        let token = CancellationToken::new();

        let handle = tokio::spawn(worker.run(token.clone()));
        token.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, IngestStats::default());
    }
}
