//! Progress logging utilities.

use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Logs progress information about connection enrichment.
///
/// # Arguments
///
/// * `start_time` - The start time of processing
/// * `enriched` - Atomic counter of enriched connections
pub fn log_progress(start_time: std::time::Instant, enriched: &Arc<AtomicUsize>) {
    let elapsed = start_time.elapsed();
    let completed = enriched.load(Ordering::SeqCst);
    let elapsed_secs = elapsed.as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        completed as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Enriched {} connections in {:.2} seconds (~{:.2} connections/sec)",
        completed, elapsed_secs, rate
    );
}
