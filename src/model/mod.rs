//! Pure data structures for the order aggregate.
//!
//! These types are what the ingest path decodes, what the durable store
//! persists and what the HTTP boundary serializes. Field names on the wire are
//! the snake_case Rust names.

pub mod order;

pub use order::*;
