//! Error handling and enrichment statistics.
//!
//! This module provides:
//! - Error type definitions for initialization and database acquisition
//! - Fallback/info classification for per-connection outcomes
//! - Statistics tracking across concurrent connection-handling tasks
//!
//! Per-connection conditions are categorized into:
//! - **Fallbacks**: lookups resolved to the Antarctica fallback pair
//! - **Info**: conditions worth counting that are not failures (reserved
//!   range normalization, realname macro expansion)
//!
//! The derivation functions themselves are total and never surface errors;
//! only start-up resource acquisition is fallible.

mod stats;
mod types;

// Re-export public API
pub use stats::EnrichmentStats;
pub use types::{FallbackReason, GeoIpError, InfoType, InitializationError};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_enrichment_stats_initialization() {
        let stats = EnrichmentStats::new();
        for reason in FallbackReason::iter() {
            assert_eq!(stats.get_fallback_count(reason), 0);
        }
        for info in InfoType::iter() {
            assert_eq!(stats.get_info_count(info), 0);
        }
        assert_eq!(stats.total_connections(), 0);
    }

    #[test]
    fn test_enrichment_stats_increment() {
        let stats = EnrichmentStats::new();
        stats.record_connection();
        stats.increment_fallback(FallbackReason::InvalidAddress);
        stats.increment_info(InfoType::RealnameExpanded);

        assert_eq!(stats.total_connections(), 1);
        assert_eq!(
            stats.get_fallback_count(FallbackReason::InvalidAddress),
            1
        );
        assert_eq!(stats.get_info_count(InfoType::RealnameExpanded), 1);
        // Other counters untouched
        assert_eq!(
            stats.get_fallback_count(FallbackReason::AddressNotFound),
            0
        );
    }

    #[test]
    fn test_enrichment_stats_totals() {
        let stats = EnrichmentStats::new();
        stats.increment_fallback(FallbackReason::InvalidAddress);
        stats.increment_fallback(FallbackReason::AddressNotFound);
        stats.increment_fallback(FallbackReason::AddressNotFound);
        assert_eq!(stats.total_fallbacks(), 3);
    }

    #[test]
    fn test_enrichment_stats_concurrent_increments() {
        use std::sync::Arc;

        let stats = Arc::new(EnrichmentStats::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    stats.record_connection();
                    stats.increment_fallback(FallbackReason::EmptyCountryCode);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("stats thread panicked");
        }
        assert_eq!(stats.total_connections(), 800);
        assert_eq!(
            stats.get_fallback_count(FallbackReason::EmptyCountryCode),
            800
        );
    }

    #[test]
    fn test_error_display_messages() {
        let err = GeoIpError::DatabaseNotFound("no sources configured".into());
        assert!(err.to_string().contains("GeoIP database not found"));

        let init: InitializationError = err.into();
        assert!(init
            .to_string()
            .contains("GeoIP database initialization error"));
    }
}
