//! MaxMind database reader and record extraction.

use std::net::IpAddr;
use std::time::SystemTime;

use maxminddb::{geoip2, Reader};

use crate::error_handling::GeoIpError;

use super::types::{GeoDbMetadata, GeoRecord};
use super::GeoLookup;

/// A loaded GeoLite2-City database.
///
/// Wraps a `maxminddb::Reader` over owned bytes together with the metadata
/// extracted at load time. The reader is never mutated after open, so a
/// shared reference is safe for concurrent lookups without locking.
pub struct GeoDatabase {
    reader: Reader<Vec<u8>>,
    metadata: GeoDbMetadata,
}

impl GeoDatabase {
    /// Parses a database from raw `.mmdb` bytes.
    ///
    /// `source` is recorded in the metadata for diagnostics (a file path or
    /// download URL).
    pub fn from_bytes(bytes: Vec<u8>, source: &str) -> Result<Self, GeoIpError> {
        let reader = Reader::from_source(bytes)?;
        let metadata = GeoDbMetadata {
            source: source.to_string(),
            version: format!("build_{}", reader.metadata.build_epoch),
            last_updated: SystemTime::now(),
        };
        Ok(GeoDatabase { reader, metadata })
    }

    /// Metadata about the loaded database.
    pub fn metadata(&self) -> &GeoDbMetadata {
        &self.metadata
    }
}

impl GeoLookup for GeoDatabase {
    fn lookup(&self, addr: IpAddr) -> Option<GeoRecord> {
        // maxminddb 0.27 API: lookup() returns a LookupResult; has_data()
        // distinguishes "address not in database" from decode failures.
        let lookup = self.reader.lookup(addr).ok()?;
        if !lookup.has_data() {
            return None;
        }
        let city: geoip2::City = match lookup.decode() {
            Ok(Some(city)) => city,
            Ok(None) => return None,
            Err(_) => return None,
        };
        Some(record_from_city(&city))
    }
}

/// Maps a decoded City response onto a [`GeoRecord`].
///
/// Only the first subdivision entry is kept, and only English names are
/// extracted, matching what the downstream tag derivation consumes.
fn record_from_city(city: &geoip2::City) -> GeoRecord {
    let mut record = GeoRecord {
        country_code: city.country.iso_code.map(|s| s.to_string()),
        country_name: city.country.names.english.map(|s| s.to_string()),
        city_name: city.city.names.english.map(|s| s.to_string()),
        postal_code: city.postal.code.map(|s| s.to_string()),
        timezone: city.location.time_zone.map(|s| s.to_string()),
        ..GeoRecord::default()
    };

    if let Some(subdivision) = city.subdivisions.first() {
        record.subdivision_code = subdivision.iso_code.map(|s| s.to_string());
        record.subdivision_name = subdivision.names.english.map(|s| s.to_string());
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = GeoDatabase::from_bytes(b"not an mmdb file".to_vec(), "test");
        assert!(matches!(result, Err(GeoIpError::InvalidDatabase(_))));
    }

    #[test]
    fn test_from_bytes_rejects_empty() {
        let result = GeoDatabase::from_bytes(Vec::new(), "test");
        assert!(result.is_err());
    }
}
