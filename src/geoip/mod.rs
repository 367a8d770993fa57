//! GeoIP lookup using MaxMind GeoLite2 databases.
//!
//! This module provides the lookup side of connection enrichment: a
//! [`GeoLookup`] capability trait the core depends on, a maxminddb-backed
//! implementation ([`GeoDatabase`]), and database acquisition (local file,
//! executable-adjacent default, or automatic download with caching).
//!
//! The database is opened once at start-up and shared read-only across all
//! connection-handling tasks; there are no process globals, the handle is
//! passed explicitly through the enricher's context.

mod init;
mod reader;
mod types;

// Re-export public API
pub use init::init_geoip;
pub use reader::GeoDatabase;
pub use types::{GeoDbMetadata, GeoRecord};

use std::net::IpAddr;

/// Default database filename, looked up next to the executable when no
/// explicit path is configured.
pub const DEFAULT_DB_FILENAME: &str = "GeoLite2-City.mmdb";

/// Default cache directory for downloaded databases.
pub const DEFAULT_CACHE_DIR: &str = ".geoip_cache";

/// Environment variable name for the MaxMind license key.
pub const MAXMIND_LICENSE_KEY_ENV: &str = "MAXMIND_LICENSE_KEY";

/// Cache TTL in seconds (7 days).
pub const CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// MaxMind download base URL.
pub const MAXMIND_DOWNLOAD_BASE: &str = "https://download.maxmind.com/app/geoip_download";

/// Capability interface for resolving an address to geographic data.
///
/// Implementations must be safe for concurrent read access: `lookup` takes
/// `&self` and is called from many connection-handling tasks at once.
///
/// `None` uniformly covers not-found, lookup errors, and degenerate data;
/// the tag derivation treats them all as "lookup failed."
pub trait GeoLookup: Send + Sync {
    /// Resolves `addr` to a geographic record, or `None` if the lookup
    /// failed or the database has no entry for the address.
    fn lookup(&self, addr: IpAddr) -> Option<GeoRecord>;
}
