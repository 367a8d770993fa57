//! Main application modules.
//!
//! Utilities for progress logging, graceful shutdown, and end-of-run
//! statistics printing used by the enrichment runner.

pub mod logging;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use logging::log_progress;
pub use shutdown::shutdown_gracefully;
pub use statistics::print_enrichment_statistics;
