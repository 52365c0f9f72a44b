//! Observability utilities for logging.

pub mod logging;

pub use logging::{LogGuard, LoggingConfig, init_logging};
