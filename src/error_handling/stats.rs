//! Enrichment statistics tracking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::IntoEnumIterator;

use super::types::{FallbackReason, InfoType};

/// Thread-safe enrichment statistics tracker.
///
/// Tracks the count of each fallback reason and informational condition using
/// atomic counters, allowing concurrent access from multiple connection
/// handling tasks. All counters are initialized to zero on creation.
///
/// # Thread Safety
///
/// This struct is thread-safe and can be shared across tasks using `Arc`.
pub struct EnrichmentStats {
    connections: AtomicUsize,
    fallbacks: HashMap<FallbackReason, AtomicUsize>,
    infos: HashMap<InfoType, AtomicUsize>,
}

impl EnrichmentStats {
    /// Creates a tracker with all counters at zero.
    pub fn new() -> Self {
        let mut fallbacks = HashMap::new();
        for reason in FallbackReason::iter() {
            fallbacks.insert(reason, AtomicUsize::new(0));
        }
        let mut infos = HashMap::new();
        for info in InfoType::iter() {
            infos.insert(info, AtomicUsize::new(0));
        }
        EnrichmentStats {
            connections: AtomicUsize::new(0),
            fallbacks,
            infos,
        }
    }

    /// Records one handled connection.
    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::SeqCst);
    }

    /// Increments the counter for a fallback reason.
    pub fn increment_fallback(&self, reason: FallbackReason) {
        if let Some(counter) = self.fallbacks.get(&reason) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Increments the counter for an informational condition.
    pub fn increment_info(&self, info: InfoType) {
        if let Some(counter) = self.infos.get(&info) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Total connections handled.
    pub fn total_connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Count for one fallback reason.
    pub fn get_fallback_count(&self, reason: FallbackReason) -> usize {
        self.fallbacks
            .get(&reason)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Count for one informational condition.
    pub fn get_info_count(&self, info: InfoType) -> usize {
        self.infos
            .get(&info)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total connections that took the fallback path, for any reason.
    pub fn total_fallbacks(&self) -> usize {
        self.fallbacks
            .values()
            .map(|c| c.load(Ordering::SeqCst))
            .sum()
    }
}

impl Default for EnrichmentStats {
    fn default() -> Self {
        Self::new()
    }
}
