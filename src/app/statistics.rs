//! Statistics printing.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{EnrichmentStats, FallbackReason, InfoType};

/// Prints enrichment statistics at the end of a run.
///
/// Zero counters are skipped so a clean run prints only the totals line.
pub fn print_enrichment_statistics(stats: &EnrichmentStats) {
    info!(
        "Enrichment statistics: connections={}, fallbacks={}",
        stats.total_connections(),
        stats.total_fallbacks()
    );

    for reason in FallbackReason::iter() {
        let count = stats.get_fallback_count(reason);
        if count > 0 {
            info!("  {}: {}", reason.as_str(), count);
        }
    }

    for info_type in InfoType::iter() {
        let count = stats.get_info_count(info_type);
        if count > 0 {
            info!("  {}: {}", info_type.as_str(), count);
        }
    }
}
