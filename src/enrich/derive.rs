//! Tag derivation from geographic lookup results.
//!
//! This is the core decision logic: a pure, total transformation from
//! `(lookup result, granularity level)` to a normalized tag set. Lookup
//! failures resolve to a stable Antarctica fallback pair, reserved ranges
//! are normalized to the same identity, and each granularity tier only adds
//! tags on top of the tiers below it.

use std::collections::HashMap;

use crate::geoip::GeoRecord;
use crate::granularity::GranularityLevel;

/// Tags attached to a connection, keyed by tag name.
///
/// Keys are unique and insertion order is irrelevant. Values are sanitized
/// at insertion: the transport consuming these tags uses space as a field
/// delimiter, so embedded spaces become underscores.
pub type TagSet = HashMap<String, String>;

/// Tag key for the ISO-3166-1 country code.
pub const TAG_COUNTRY_CODE: &str = "geo/country-code";
/// Tag key for the country name.
pub const TAG_COUNTRY_NAME: &str = "geo/country-name";
/// Tag key for the IANA timezone.
pub const TAG_TIMEZONE: &str = "geo/timezone";
/// Tag key for the subdivision (state/province) code.
pub const TAG_SUBDIVISION_CODE: &str = "geo/subdivision-code";
/// Tag key for the subdivision name.
pub const TAG_SUBDIVISION_NAME: &str = "geo/subdivision-name";
/// Tag key for the composite `COUNTRY-SUBDIVISION` region code.
pub const TAG_REGION_CODE: &str = "geo/region-code";
/// Tag key for the region name.
pub const TAG_REGION_NAME: &str = "geo/region-name";
/// Tag key for the city name.
pub const TAG_CITY_NAME: &str = "geo/city-name";
/// Tag key for the postal code.
pub const TAG_POSTAL_CODE: &str = "geo/postal-code";

/// Every tag key this component may emit.
pub const GEO_TAG_KEYS: &[&str] = &[
    TAG_COUNTRY_CODE,
    TAG_COUNTRY_NAME,
    TAG_TIMEZONE,
    TAG_SUBDIVISION_CODE,
    TAG_SUBDIVISION_NAME,
    TAG_REGION_CODE,
    TAG_REGION_NAME,
    TAG_CITY_NAME,
    TAG_POSTAL_CODE,
];

/// Country code emitted when a lookup fails or hits a reserved range.
pub const FALLBACK_COUNTRY_CODE: &str = "AQ";
/// Country name paired with [`FALLBACK_COUNTRY_CODE`].
pub const FALLBACK_COUNTRY_NAME: &str = "Antarctica";
/// Sentinel some datasets return for anonymous or reserved ranges.
pub const RESERVED_COUNTRY_CODE: &str = "--";

/// Derives the tag set for one lookup result at the configured level.
///
/// `record` is `None` when the lookup failed; a record without a country
/// code is treated the same way. Both produce exactly the fallback pair
/// `geo/country-code=AQ`, `geo/country-name=Antarctica`, regardless of
/// level. A record carrying the reserved `"--"` code keeps its other fields:
/// the country identity is rewritten to the fallback, but tiers like
/// timezone still emit from the original record.
///
/// For a fixed record the output grows monotonically with the level: each
/// tier only adds tags.
pub fn derive_tags(record: Option<&GeoRecord>, level: GranularityLevel) -> TagSet {
    let mut tags = TagSet::new();

    let Some(record) = record else {
        return fallback_tags();
    };
    let raw_code = record.country_code.as_deref().unwrap_or("");
    if raw_code.is_empty() {
        return fallback_tags();
    }

    // Reserved-range normalization happens before any tier runs, so the
    // composite region code below also sees the rewritten identity.
    let (country_code, country_name) = if raw_code == RESERVED_COUNTRY_CODE {
        (FALLBACK_COUNTRY_CODE, Some(FALLBACK_COUNTRY_NAME))
    } else {
        (raw_code, non_empty(record.country_name.as_deref()))
    };

    if level >= GranularityLevel::Timezone {
        if let Some(timezone) = non_empty(record.timezone.as_deref()) {
            insert_tag(&mut tags, TAG_TIMEZONE, timezone);
        }
    }

    if level >= GranularityLevel::Country {
        insert_tag(&mut tags, TAG_COUNTRY_CODE, country_code);
        // Name falls back to the code so the pair is always complete.
        insert_tag(&mut tags, TAG_COUNTRY_NAME, country_name.unwrap_or(country_code));
    }

    if level >= GranularityLevel::Subdivision {
        let subdivision_code = non_empty(record.subdivision_code.as_deref());
        let subdivision_name =
            non_empty(record.subdivision_name.as_deref()).or(subdivision_code);

        if let Some(name) = subdivision_name {
            insert_tag(&mut tags, TAG_SUBDIVISION_NAME, name);
        }
        if let Some(code) = subdivision_code {
            insert_tag(&mut tags, TAG_SUBDIVISION_CODE, code);
            // The composite region identifier requires both codes; the
            // plain subdivision tags above do not.
            if !country_code.is_empty() {
                insert_tag(
                    &mut tags,
                    TAG_REGION_CODE,
                    &format!("{}-{}", country_code, code),
                );
                if let Some(name) = subdivision_name {
                    insert_tag(&mut tags, TAG_REGION_NAME, name);
                }
            }
        }
    }

    if level >= GranularityLevel::City {
        if let Some(city) = non_empty(record.city_name.as_deref()) {
            insert_tag(&mut tags, TAG_CITY_NAME, city);
        }
    }

    if level >= GranularityLevel::Postal {
        if let Some(postal) = non_empty(record.postal_code.as_deref()) {
            insert_tag(&mut tags, TAG_POSTAL_CODE, postal);
        }
    }

    tags
}

/// The country code after fallback and reserved-range normalization.
///
/// This is the code the realname macro expander substitutes: the record's
/// code, or `AQ` when the lookup failed, the code is empty, or the record
/// carries the reserved sentinel.
pub fn normalized_country_code(record: Option<&GeoRecord>) -> &str {
    match record.and_then(|r| non_empty(r.country_code.as_deref())) {
        Some(RESERVED_COUNTRY_CODE) | None => FALLBACK_COUNTRY_CODE,
        Some(code) => code,
    }
}

/// Whether the record would take the complete fallback path in
/// [`derive_tags`].
pub fn is_fallback(record: Option<&GeoRecord>) -> bool {
    record
        .and_then(|r| non_empty(r.country_code.as_deref()))
        .is_none()
}

/// The level-independent fallback pair.
fn fallback_tags() -> TagSet {
    let mut tags = TagSet::new();
    insert_tag(&mut tags, TAG_COUNTRY_CODE, FALLBACK_COUNTRY_CODE);
    insert_tag(&mut tags, TAG_COUNTRY_NAME, FALLBACK_COUNTRY_NAME);
    tags
}

/// Writes a tag, sanitizing the value. Empty values are never written.
fn insert_tag(tags: &mut TagSet, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    tags.insert(key.to_string(), value.replace(' ', "_"));
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
