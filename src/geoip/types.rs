//! GeoIP data structures.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Metadata about the loaded GeoIP database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoDbMetadata {
    /// Source path or URL the database was loaded from.
    pub source: String,
    /// Database build version (extracted from the database's build epoch).
    pub version: String,
    /// When the database was last fetched or read.
    pub last_updated: SystemTime,
}

/// One geographic lookup result for a remote address.
///
/// Produced fresh per lookup and immutable once returned. Fields the
/// database has no data for are `None`; `country_code` may also carry the
/// `"--"` sentinel some datasets use for reserved or anonymous ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoRecord {
    /// ISO-3166-1 alpha-2 country code, or `"--"` for reserved ranges.
    pub country_code: Option<String>,
    /// English country name.
    pub country_name: Option<String>,
    /// ISO-3166-2 subdivision code of the first subdivision entry.
    pub subdivision_code: Option<String>,
    /// English name of the first subdivision entry.
    pub subdivision_name: Option<String>,
    /// English city name.
    pub city_name: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// IANA timezone name.
    pub timezone: Option<String>,
}
