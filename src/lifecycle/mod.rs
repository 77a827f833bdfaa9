//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Handle dropped or shut down → token cancelled → watch worker exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary shuts the provider down
//! ```
//!
//! # Design Decisions
//! - One cancellation token per provider, shared by the worker and its handle
//! - Cancellation is raced against every stream read

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{wait_for_termination, Signal};
