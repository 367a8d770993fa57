//! Error type definitions.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error acquiring the GeoIP database at start-up.
    ///
    /// This is fatal to the enrichment component: without a database it must
    /// not serve lookups. The host decides whether to abort or run without
    /// enrichment.
    #[error("GeoIP database initialization error: {0}")]
    GeoDatabaseError(#[from] GeoIpError),
}

/// Error types for GeoIP database acquisition and loading.
#[derive(Error, Debug)]
pub enum GeoIpError {
    /// No database could be located through any configured source.
    #[error("GeoIP database not found: {0}")]
    DatabaseNotFound(String),

    /// Filesystem error reading or caching the database.
    #[error("GeoIP database I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but is not a valid MaxMind database.
    #[error("Invalid GeoIP database: {0}")]
    InvalidDatabase(#[from] maxminddb::MaxMindDbError),

    /// Download from MaxMind failed.
    #[error("GeoIP database download error: {0}")]
    DownloadError(#[from] reqwest::Error),

    /// The downloaded archive could not be unpacked.
    #[error("GeoIP archive error: {0}")]
    ArchiveError(String),
}

/// Reasons a connection received the Antarctica fallback tag pair instead of
/// real geography.
///
/// All three are recovered locally and are never user-visible errors; they
/// are tracked for the end-of-run statistics printout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FallbackReason {
    /// The remote address did not parse as an IP address.
    InvalidAddress,
    /// The address parsed but the database had no entry for it.
    AddressNotFound,
    /// The database returned a record with no country code.
    EmptyCountryCode,
}

impl FallbackReason {
    /// Human-readable label for statistics output.
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::InvalidAddress => "Invalid remote address",
            FallbackReason::AddressNotFound => "Address not in database",
            FallbackReason::EmptyCountryCode => "Record without country code",
        }
    }
}

/// Informational conditions that are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    /// A reserved/anonymous range (`"--"`) was normalized to the fallback
    /// identity.
    ReservedRangeNormalized,
    /// A `%country` macro was expanded in a realname field.
    RealnameExpanded,
}

impl InfoType {
    /// Human-readable label for statistics output.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::ReservedRangeNormalized => "Reserved range normalized",
            InfoType::RealnameExpanded => "Realname macro expanded",
        }
    }
}
