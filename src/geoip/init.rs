//! GeoIP database acquisition.
//!
//! Resolves and opens the GeoLite2-City database at start-up, trying in
//! order: an explicit path, a database file next to the executable, and a
//! cached or freshly downloaded copy from MaxMind (when a license key is
//! configured). Acquisition failure is fatal to the enrichment component,
//! which must not serve lookups without a database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::form_urlencoded;

use crate::error_handling::GeoIpError;

use super::reader::GeoDatabase;
use super::types::GeoDbMetadata;
use super::{
    CACHE_TTL_SECS, DEFAULT_CACHE_DIR, DEFAULT_DB_FILENAME, MAXMIND_DOWNLOAD_BASE,
    MAXMIND_LICENSE_KEY_ENV,
};

/// Initializes the GeoIP database.
///
/// # Arguments
///
/// * `geoip_path` - Optional explicit path to a `.mmdb` file. When `None`,
///   a `GeoLite2-City.mmdb` next to the executable is tried, then an
///   automatic download using the `MAXMIND_LICENSE_KEY` environment
///   variable.
/// * `cache_dir` - Optional cache directory for downloaded databases
///   (defaults to `.geoip_cache`).
///
/// # Errors
///
/// Returns [`GeoIpError::DatabaseNotFound`] if no source yields a database,
/// or the underlying I/O, parse, or download error otherwise.
pub async fn init_geoip(
    geoip_path: Option<&str>,
    cache_dir: Option<&Path>,
) -> Result<Arc<GeoDatabase>, GeoIpError> {
    if let Some(path) = geoip_path {
        let db = load_from_file(Path::new(path)).await?;
        return Ok(Arc::new(db));
    }

    if let Some(path) = executable_adjacent_db() {
        log::info!("Using GeoIP database next to the executable: {}", path.display());
        let db = load_from_file(&path).await?;
        return Ok(Arc::new(db));
    }

    let cache_path = cache_dir
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

    match std::env::var(MAXMIND_LICENSE_KEY_ENV) {
        Ok(license_key) if !license_key.is_empty() => {
            let db = load_from_download(&license_key, &cache_path).await?;
            Ok(Arc::new(db))
        }
        _ => Err(GeoIpError::DatabaseNotFound(format!(
            "no --geoip path given, no {} next to the executable, and {} is not set",
            DEFAULT_DB_FILENAME, MAXMIND_LICENSE_KEY_ENV
        ))),
    }
}

/// Path of the default database file next to the executable, if it exists.
fn executable_adjacent_db() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.parent()?.join(DEFAULT_DB_FILENAME);
    candidate.exists().then_some(candidate)
}

/// Loads the database from a local `.mmdb` file.
async fn load_from_file(path: &Path) -> Result<GeoDatabase, GeoIpError> {
    log::info!("Loading GeoIP database from: {}", path.display());
    let bytes = tokio::fs::read(path).await?;
    let db = GeoDatabase::from_bytes(bytes, &path.to_string_lossy())?;
    log::info!(
        "GeoIP database opened ({}, {})",
        db.metadata().source,
        db.metadata().version
    );
    Ok(db)
}

/// Loads the database from the download cache, refreshing it from MaxMind
/// when the cached copy is missing or older than the cache TTL.
async fn load_from_download(
    license_key: &str,
    cache_dir: &Path,
) -> Result<GeoDatabase, GeoIpError> {
    tokio::fs::create_dir_all(cache_dir).await?;

    let cache_file = cache_dir.join(DEFAULT_DB_FILENAME);
    let metadata_file = cache_dir.join("metadata.json");

    let cache_is_fresh = match load_metadata(&metadata_file).await {
        Ok(metadata) => match metadata.last_updated.elapsed() {
            Ok(age) => age.as_secs() < CACHE_TTL_SECS && cache_file.exists(),
            Err(_) => false,
        },
        Err(_) => false,
    };

    if cache_is_fresh {
        log::info!("Using cached GeoIP database: {}", cache_file.display());
        return load_from_file(&cache_file).await;
    }

    log::info!("Downloading GeoLite2-City database (cache expired or missing)");
    match download_database(license_key).await {
        Ok(bytes) => {
            let db = GeoDatabase::from_bytes(bytes.clone(), MAXMIND_DOWNLOAD_BASE)?;
            tokio::fs::write(&cache_file, &bytes).await?;
            save_metadata(db.metadata(), &metadata_file).await?;
            log::info!(
                "GeoIP database opened ({}, {})",
                db.metadata().source,
                db.metadata().version
            );
            Ok(db)
        }
        Err(e) if cache_file.exists() => {
            // A stale cache beats no database at all.
            log::warn!(
                "GeoIP download failed ({}), falling back to stale cache: {}",
                e,
                cache_file.display()
            );
            load_from_file(&cache_file).await
        }
        Err(e) => Err(e),
    }
}

/// Downloads the GeoLite2-City tar.gz from MaxMind and extracts the `.mmdb`
/// member.
async fn download_database(license_key: &str) -> Result<Vec<u8>, GeoIpError> {
    // URL-encode the license key to handle special characters
    let encoded_key = form_urlencoded::byte_serialize(license_key.as_bytes()).collect::<String>();
    let download_url = format!(
        "{}?edition_id=GeoLite2-City&license_key={}&suffix=tar.gz",
        MAXMIND_DOWNLOAD_BASE, encoded_key
    );

    let response = reqwest::get(&download_url).await?.error_for_status()?;
    let archive = response.bytes().await?;
    extract_mmdb_from_tar_gz(&archive, "GeoLite2-City")
}

/// Extracts the `<db_name>.mmdb` member from a tar.gz archive.
///
/// MaxMind archives nest the database under a dated directory, so matching
/// is by file name, not full path.
fn extract_mmdb_from_tar_gz(tar_gz_bytes: &[u8], db_name: &str) -> Result<Vec<u8>, GeoIpError> {
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tar::Archive;

    let expected_name = format!("{}.mmdb", db_name);
    let mut archive = Archive::new(GzDecoder::new(tar_gz_bytes));

    let entries = archive
        .entries()
        .map_err(|e| GeoIpError::ArchiveError(format!("failed to read tar entries: {}", e)))?;

    for entry_result in entries {
        let mut entry = entry_result
            .map_err(|e| GeoIpError::ArchiveError(format!("failed to read tar entry: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| GeoIpError::ArchiveError(format!("failed to read entry path: {}", e)))?;

        if path.file_name().and_then(|n| n.to_str()) == Some(expected_name.as_str()) {
            let mut mmdb_bytes = Vec::new();
            entry.read_to_end(&mut mmdb_bytes).map_err(|e| {
                GeoIpError::ArchiveError(format!("failed to read {}: {}", expected_name, e))
            })?;
            log::debug!("Extracted {} ({} bytes)", expected_name, mmdb_bytes.len());
            return Ok(mmdb_bytes);
        }
    }

    Err(GeoIpError::ArchiveError(format!(
        "{} not found in archive",
        expected_name
    )))
}

/// Loads cached metadata from disk.
async fn load_metadata(metadata_file: &Path) -> Result<GeoDbMetadata, GeoIpError> {
    let content = tokio::fs::read_to_string(metadata_file).await?;
    serde_json::from_str(&content)
        .map_err(|e| GeoIpError::ArchiveError(format!("invalid cached metadata: {}", e)))
}

/// Saves metadata next to the cached database.
async fn save_metadata(metadata: &GeoDbMetadata, metadata_file: &Path) -> Result<(), GeoIpError> {
    let content = serde_json::to_string_pretty(metadata)
        .map_err(|e| GeoIpError::ArchiveError(format!("failed to encode metadata: {}", e)))?;
    tokio::fs::write(metadata_file, content).await?;
    Ok(())
}
