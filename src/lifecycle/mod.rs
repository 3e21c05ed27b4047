//! # Lifecycle
//!
//! Startup, task supervision and shutdown.
//!
//! - [`OrderSystem`]: owns the shared cancellation token and the running tasks.
//! - [`shutdown_signal`]: resolves on SIGINT/SIGTERM.
//! - [`setup_tracing`]: global subscriber setup.

pub mod order_system;
pub mod tracing;

pub use self::order_system::{
    shutdown_signal, OrderSystem, ShutdownHandle, ShutdownReport, ShutdownTrigger, TaskError,
    TaskFailure, DEFAULT_SHUTDOWN_GRACE,
};
pub use self::tracing::setup_tracing;
