//! # Order Service
//!
//! > **An order-ingest service with a bounded, recency-ordered cache in front of
//! > a durable store.**
//!
//! Orders arrive as JSON messages, are validated and persisted, and are served
//! back by uid over HTTP. Reads go through a capacity-bounded LRU cache; the
//! durable store stays the source of truth.
//!
//! ## Design Notes
//!
//! ### 1. Cache-Aside
//! Writes go to the durable store first and to the cache second; reads try the
//! cache and fall back to the store, repopulating the cache on the way out. A
//! failed cache update after a successful durable write is logged, never
//! reported to the caller. See [`service`].
//!
//! ### 2. One Lock per Cache
//! [`BoundedCache`](cache::BoundedCache) keeps its map and recency list behind a
//! single `parking_lot::RwLock`. The recency list is an index arena with a free
//! list, so promotion and eviction are O(1) and allocation-free once warm.
//!
//! ### 3. Cancellation Everywhere
//! Every core call takes a [`RequestContext`](context::RequestContext): a
//! cancellation token plus an optional deadline, checked before any lock or
//! I/O.
//!
//! ### 4. Observability
//! `tracing` throughout, with `#[instrument]` spans on service and handler
//! entry points. See [`lifecycle::tracing`].
//!
//! ## Module Tour
//!
//! ### 1. The Core ([`cache`], [`service`], [`store`])
//! - **Role**: The LRU cache, the cache-aside policy, and the durable store
//!   contract with its implementations.
//! - **Key items**: [`BoundedCache`](cache::BoundedCache),
//!   [`OrderService`](service::OrderService),
//!   [`DurableStore`](store::DurableStore).
//!
//! ### 2. The Boundaries ([`ingest`], [`http`])
//! - **Role**: Turn messages into saved orders, and lookups into responses.
//!   Both talk to the core through the [`Orders`](service::Orders) trait.
//!
//! ### 3. The Orchestrator ([`lifecycle`])
//! - **Role**: Builds the service, warms the cache, runs the tasks, and shuts
//!   them down together.
//! - **Key items**: [`OrderSystem`](lifecycle::OrderSystem),
//!   [`ShutdownReport`](lifecycle::ShutdownReport).
//!
//! ### 4. Supporting Pieces ([`model`], [`error`], [`context`], [`config`])
//!
//! ## Quick Start
//!
//! ```bash
//! # In-memory store, orders from stdin, HTTP on :8080
//! RUST_LOG=info cargo run < orders.ndjson
//!
//! # File-backed store, orders from a file
//! ORDERS_STORE__DIR=./data ORDERS_INGEST__SOURCE=orders.ndjson cargo run
//!
//! # Generated orders piped in, one every 200ms
//! cargo run --bin producer -- -n 50 --interval-ms 200 | cargo run
//!
//! curl localhost:8080/orders/b563feb7b2b84b6test
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod ingest;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod store;
