//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the global `tracing` subscriber. The binary calls
//! it once, before anything else logs.
//!
//! ## Configuration
//!
//! The level comes from `RUST_LOG`. Output is compact and hides the module
//! prefix (`with_target(false)`); the structured fields carry the context.
//!
//! ```bash
//! # Lifecycle events, ingested orders, swallowed failures
//! RUST_LOG=info order-service
//!
//! # Decoded payloads, cache hits and misses
//! RUST_LOG=debug order-service
//!
//! # Evictions
//! RUST_LOG=order_service::cache=trace order-service
//! ```
//!
//! ## Levels
//!
//! - `info`: task start/stop, shutdown trigger, each ingested order, cache warm-up.
//! - `debug`: decoded payloads (`?order`), cache hit/miss, lookup misses at the
//!   HTTP boundary.
//! - `warn`: dropped messages, cache writes that failed after a durable save,
//!   the grace period running out.
//! - `error`: a task ending with an error, non-404 lookup failures.
//!
//! Service and handler entry points run inside `#[instrument]` spans, so a line
//! logged deep inside a lookup still carries the order uid:
//!
//! ```text
//! INFO Task started task="ingest"
//! INFO save_order{order_uid=b563feb7b2b84b6test}: Order ingested order_uid=b563feb7b2b84b6test
//! DEBUG get_order{id="b563feb7b2b84b6test"}:get_order_by_id{id=OrderUid("b563feb7b2b84b6test")}: Cache hit
//! WARN Grace period elapsed, aborting remaining tasks remaining=1 grace_secs=40
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
