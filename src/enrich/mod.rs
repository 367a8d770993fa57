//! Per-connection enrichment orchestration.
//!
//! This module glues the pure pieces together: per connection-opened event
//! it runs the geographic lookup, derives tags, merges them into the
//! connection's state, and expands the realname macro. The host's event
//! dispatcher only needs a reference to [`ConnectionEnricher`] and calls
//! [`ConnectionEnricher::enrich_connection`] once per new connection.

pub mod derive;
pub mod realname;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use log::{debug, info};

use crate::error_handling::{EnrichmentStats, FallbackReason, InfoType};
use crate::geoip::{GeoLookup, GeoRecord};
use crate::granularity::GranularityLevel;

use derive::{
    derive_tags, normalized_country_code, TagSet, RESERVED_COUNTRY_CODE, TAG_CITY_NAME,
    TAG_COUNTRY_CODE, TAG_REGION_CODE,
};
use realname::expand_country_macro;

/// The slice of connection state this component reads and mutates.
///
/// The host gateway owns the connection's lifecycle; enrichment only fills
/// in `tags` (created lazily on first write) and rewrites `real_name`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    /// Remote endpoint as the gateway saw it. May carry a port
    /// (`1.2.3.4:5678`, `[2001:db8::1]:443`) and may be malformed.
    pub remote_addr: String,
    /// Tag annotations consumed by downstream protocol logic. `None` until
    /// the first writer creates the map.
    pub tags: Option<TagSet>,
    /// Free-text realname field; `%country` tokens are expanded in place.
    pub real_name: String,
}

impl ConnectionState {
    /// A fresh connection state for `remote_addr` with no tags set.
    pub fn new(remote_addr: impl Into<String>) -> Self {
        ConnectionState {
            remote_addr: remote_addr.into(),
            tags: None,
            real_name: String::new(),
        }
    }
}

/// Shared, immutable enrichment context.
///
/// Holds the lookup capability and the granularity level resolved once at
/// start-up. All methods take `&self`; the struct is shared via `Arc`
/// across concurrently handled connections without locking.
pub struct ConnectionEnricher {
    lookup: Arc<dyn GeoLookup>,
    level: GranularityLevel,
    stats: Arc<EnrichmentStats>,
}

impl ConnectionEnricher {
    /// Creates an enricher over an opened lookup handle.
    pub fn new(lookup: Arc<dyn GeoLookup>, level: GranularityLevel) -> Self {
        ConnectionEnricher {
            lookup,
            level,
            stats: Arc::new(EnrichmentStats::new()),
        }
    }

    /// The granularity level this enricher was configured with.
    pub fn level(&self) -> GranularityLevel {
        self.level
    }

    /// Shared statistics handle, alive beyond [`ConnectionEnricher::close`].
    pub fn stats(&self) -> Arc<EnrichmentStats> {
        Arc::clone(&self.stats)
    }

    /// Handles one connection-opened event.
    ///
    /// Looks up the remote address (an unparseable address counts as a
    /// failed lookup), derives tags at the configured level, and merges
    /// them into the connection's tag map, creating it if absent,
    /// overwriting stale geo keys, and preserving unrelated keys. Finally
    /// expands `%country` in a non-empty realname.
    pub fn enrich_connection(&self, conn: &mut ConnectionState) {
        self.stats.record_connection();

        let record = self.lookup_remote(&conn.remote_addr);
        let record_ref = record.as_ref();

        if record_ref.map(|r| r.country_code.as_deref()) == Some(Some(RESERVED_COUNTRY_CODE)) {
            self.stats.increment_info(InfoType::ReservedRangeNormalized);
        }

        let derived = derive_tags(record_ref, self.level);
        let summary = (
            derived
                .get(TAG_COUNTRY_CODE)
                .map(String::as_str)
                .unwrap_or("-")
                .to_string(),
            derived
                .get(TAG_REGION_CODE)
                .map(String::as_str)
                .unwrap_or("-")
                .to_string(),
            derived
                .get(TAG_CITY_NAME)
                .map(String::as_str)
                .unwrap_or("-")
                .to_string(),
        );

        let tags = conn.tags.get_or_insert_with(TagSet::new);
        for (key, value) in derived {
            tags.insert(key, value);
        }

        if !conn.real_name.is_empty() {
            let code = normalized_country_code(record_ref);
            let expanded = expand_country_macro(&conn.real_name, code);
            if expanded != conn.real_name {
                self.stats.increment_info(InfoType::RealnameExpanded);
                conn.real_name = expanded;
            }
        }

        info!(
            "Geo tags (level {}): {} -> {}/{}, {}",
            self.level.as_u8(),
            conn.remote_addr,
            summary.0,
            summary.1,
            summary.2
        );
    }

    /// Releases the lookup handle.
    ///
    /// Called on the shutdown signal; the host awaits it before reporting
    /// the component fully stopped. In-flight enrichments holding their own
    /// `Arc` clones finish undisturbed; no new lookups are issued through
    /// this enricher afterwards.
    pub fn close(self) {
        let ConnectionEnricher { lookup, .. } = self;
        drop(lookup);
        info!("GeoIP database handle released");
    }

    fn lookup_remote(&self, remote_addr: &str) -> Option<GeoRecord> {
        let Some(addr) = parse_remote_addr(remote_addr) else {
            debug!("Remote address '{}' did not parse, using fallback", remote_addr);
            self.stats.increment_fallback(FallbackReason::InvalidAddress);
            return None;
        };

        let record = self.lookup.lookup(addr);
        match &record {
            None => self.stats.increment_fallback(FallbackReason::AddressNotFound),
            Some(r) if r.country_code.as_deref().unwrap_or("").is_empty() => {
                self.stats.increment_fallback(FallbackReason::EmptyCountryCode)
            }
            Some(_) => {}
        }
        record
    }
}

/// Extracts the IP address from a gateway remote-endpoint string.
///
/// Accepts bare IPv4/IPv6 addresses and `host:port` socket forms
/// (IPv6 bracketed). Anything else is `None`; the caller treats that as a
/// failed lookup, never an error.
fn parse_remote_addr(raw: &str) -> Option<IpAddr> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(addr) = trimmed.parse::<IpAddr>() {
        return Some(addr);
    }
    trimmed.parse::<SocketAddr>().ok().map(|sock| sock.ip())
}

#[cfg(test)]
mod tests {
    use super::derive::{
        TAG_COUNTRY_NAME, TAG_POSTAL_CODE, TAG_SUBDIVISION_NAME, TAG_TIMEZONE,
    };
    use super::*;
    use std::net::Ipv4Addr;

    /// Lookup stub returning a fixed record for every address.
    struct StaticLookup(Option<GeoRecord>);

    impl GeoLookup for StaticLookup {
        fn lookup(&self, _addr: IpAddr) -> Option<GeoRecord> {
            self.0.clone()
        }
    }

    fn test_record() -> GeoRecord {
        GeoRecord {
            country_code: Some("US".to_string()),
            country_name: Some("United States".to_string()),
            subdivision_code: Some("CA".to_string()),
            subdivision_name: Some("California".to_string()),
            city_name: Some("San Francisco".to_string()),
            postal_code: Some("94102".to_string()),
            timezone: Some("America/Los_Angeles".to_string()),
        }
    }

    fn enricher_with(record: Option<GeoRecord>, level: GranularityLevel) -> ConnectionEnricher {
        ConnectionEnricher::new(Arc::new(StaticLookup(record)), level)
    }

    #[test]
    fn test_parse_remote_addr_forms() {
        assert_eq!(
            parse_remote_addr("192.0.2.7"),
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)))
        );
        assert_eq!(
            parse_remote_addr("192.0.2.7:5678"),
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)))
        );
        assert_eq!(
            parse_remote_addr("2001:db8::1"),
            "2001:db8::1".parse::<IpAddr>().ok()
        );
        assert_eq!(
            parse_remote_addr("[2001:db8::1]:443"),
            "2001:db8::1".parse::<IpAddr>().ok()
        );
        assert_eq!(parse_remote_addr(""), None);
        assert_eq!(parse_remote_addr("not-an-address"), None);
        assert_eq!(parse_remote_addr("999.0.0.1"), None);
    }

    #[test]
    fn test_enrich_creates_tag_map_lazily() {
        let enricher = enricher_with(Some(test_record()), GranularityLevel::Postal);
        let mut conn = ConnectionState::new("192.0.2.7");
        assert!(conn.tags.is_none());

        enricher.enrich_connection(&mut conn);

        let tags = conn.tags.expect("tag map should have been created");
        assert_eq!(tags[TAG_COUNTRY_CODE], "US");
        assert_eq!(tags[TAG_POSTAL_CODE], "94102");
    }

    #[test]
    fn test_enrich_preserves_unrelated_tags_and_overwrites_geo_tags() {
        let enricher = enricher_with(Some(test_record()), GranularityLevel::Country);
        let mut conn = ConnectionState::new("192.0.2.7");

        let mut existing = TagSet::new();
        existing.insert("proto/ip-family".to_string(), "ipv4".to_string());
        existing.insert(TAG_COUNTRY_CODE.to_string(), "ZZ".to_string());
        conn.tags = Some(existing);

        enricher.enrich_connection(&mut conn);

        let tags = conn.tags.unwrap();
        assert_eq!(tags["proto/ip-family"], "ipv4");
        assert_eq!(tags[TAG_COUNTRY_CODE], "US");
    }

    #[test]
    fn test_enrich_invalid_address_falls_back() {
        let enricher = enricher_with(Some(test_record()), GranularityLevel::Postal);
        let mut conn = ConnectionState::new("definitely not an ip");

        enricher.enrich_connection(&mut conn);

        let tags = conn.tags.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[TAG_COUNTRY_CODE], "AQ");
        assert_eq!(tags[TAG_COUNTRY_NAME], "Antarctica");
        assert_eq!(
            enricher
                .stats()
                .get_fallback_count(FallbackReason::InvalidAddress),
            1
        );
    }

    #[test]
    fn test_enrich_lookup_miss_falls_back() {
        let enricher = enricher_with(None, GranularityLevel::Postal);
        let mut conn = ConnectionState::new("192.0.2.7");

        enricher.enrich_connection(&mut conn);

        let tags = conn.tags.unwrap();
        assert_eq!(tags[TAG_COUNTRY_CODE], "AQ");
        assert_eq!(
            enricher
                .stats()
                .get_fallback_count(FallbackReason::AddressNotFound),
            1
        );
    }

    #[test]
    fn test_enrich_empty_country_code_counted() {
        let record = GeoRecord {
            country_code: Some(String::new()),
            ..GeoRecord::default()
        };
        let enricher = enricher_with(Some(record), GranularityLevel::Postal);
        let mut conn = ConnectionState::new("192.0.2.7");

        enricher.enrich_connection(&mut conn);

        assert_eq!(conn.tags.unwrap()[TAG_COUNTRY_CODE], "AQ");
        assert_eq!(
            enricher
                .stats()
                .get_fallback_count(FallbackReason::EmptyCountryCode),
            1
        );
    }

    #[test]
    fn test_enrich_expands_realname() {
        let enricher = enricher_with(Some(test_record()), GranularityLevel::Country);
        let mut conn = ConnectionState::new("192.0.2.7");
        conn.real_name = "user (%country)".to_string();

        enricher.enrich_connection(&mut conn);

        assert_eq!(conn.real_name, "user (US)");
        assert_eq!(
            enricher.stats().get_info_count(InfoType::RealnameExpanded),
            1
        );
    }

    #[test]
    fn test_enrich_realname_uses_fallback_code() {
        let enricher = enricher_with(None, GranularityLevel::Postal);
        let mut conn = ConnectionState::new("192.0.2.7");
        conn.real_name = "from %country".to_string();

        enricher.enrich_connection(&mut conn);

        assert_eq!(conn.real_name, "from AQ");
    }

    #[test]
    fn test_enrich_realname_expands_even_below_country_tier() {
        // The country tier emits no tags at level 1, but the code is still
        // derived for the macro.
        let enricher = enricher_with(Some(test_record()), GranularityLevel::Timezone);
        let mut conn = ConnectionState::new("192.0.2.7");
        conn.real_name = "%country".to_string();

        enricher.enrich_connection(&mut conn);

        assert!(!conn.tags.as_ref().unwrap().contains_key(TAG_COUNTRY_CODE));
        assert_eq!(conn.real_name, "US");
    }

    #[test]
    fn test_enrich_reserved_range() {
        let record = GeoRecord {
            country_code: Some("--".to_string()),
            timezone: Some("UTC".to_string()),
            ..GeoRecord::default()
        };
        let enricher = enricher_with(Some(record), GranularityLevel::Country);
        let mut conn = ConnectionState::new("192.0.2.7");

        enricher.enrich_connection(&mut conn);

        let tags = conn.tags.unwrap();
        assert_eq!(tags[TAG_COUNTRY_CODE], "AQ");
        assert_eq!(tags[TAG_TIMEZONE], "UTC");
        assert_eq!(
            enricher
                .stats()
                .get_info_count(InfoType::ReservedRangeNormalized),
            1
        );
    }

    #[test]
    fn test_enrich_respects_granularity() {
        let enricher = enricher_with(Some(test_record()), GranularityLevel::Subdivision);
        let mut conn = ConnectionState::new("192.0.2.7");

        enricher.enrich_connection(&mut conn);

        let tags = conn.tags.unwrap();
        assert_eq!(tags[TAG_SUBDIVISION_NAME], "California");
        assert!(!tags.contains_key(TAG_POSTAL_CODE));
    }

    #[test]
    fn test_stats_survive_close() {
        let enricher = enricher_with(Some(test_record()), GranularityLevel::Postal);
        let stats = enricher.stats();
        let mut conn = ConnectionState::new("192.0.2.7");
        enricher.enrich_connection(&mut conn);
        enricher.close();

        assert_eq!(stats.total_connections(), 1);
    }
}
