//! geotag library: connection geo-tag enrichment
//!
//! This library resolves remote addresses to geographic metadata and
//! attaches it as normalized `geo/*` tags to connection state, for
//! downstream protocol use. The derivation core (granularity gating,
//! Antarctica fallback, reserved-range normalization, `%country` macro
//! expansion) is pure and synchronous; the surrounding runner enriches
//! many connections concurrently against a shared read-only GeoLite2
//! database.
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use geotag::{run_enrichment, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::parse_from(["geotag", "addrs.txt", "--granularity", "city"]);
//!
//! let report = run_enrichment(config).await?;
//! println!(
//!     "Enriched {} connections ({} fallbacks)",
//!     report.total_connections, report.fallbacks
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! `run_enrichment` requires a Tokio runtime. Embedders that only need the
//! per-connection core can construct a [`ConnectionEnricher`] directly and
//! call it from their own dispatch loop; the core never blocks or suspends.

#![warn(missing_docs)]

mod app;
pub mod config;
pub mod enrich;
mod error_handling;
pub mod geoip;
pub mod granularity;
pub mod initialization;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, OutputFormat};
pub use enrich::derive::{derive_tags, normalized_country_code, TagSet};
pub use enrich::realname::expand_country_macro;
pub use enrich::{ConnectionEnricher, ConnectionState};
pub use error_handling::{
    EnrichmentStats, FallbackReason, GeoIpError, InfoType, InitializationError,
};
pub use geoip::{init_geoip, GeoDatabase, GeoLookup, GeoRecord};
pub use granularity::GranularityLevel;
pub use run::{run_enrichment, EnrichReport};

// Internal run module (contains the enrichment runner)
mod run {
    use anyhow::{Context, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use log::{info, warn};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio_util::sync::CancellationToken;

    use crate::app::{log_progress, print_enrichment_statistics, shutdown_gracefully};
    use crate::config::{Config, OutputFormat, LOGGING_INTERVAL_SECS};
    use crate::enrich::{ConnectionEnricher, ConnectionState};
    use crate::geoip::{init_geoip, GeoLookup};
    use crate::granularity::GranularityLevel;
    use crate::initialization::init_semaphore;

    /// Results of an enrichment run.
    #[derive(Debug, Clone)]
    pub struct EnrichReport {
        /// Number of connections handled.
        pub total_connections: usize,
        /// Connections that resolved to the Antarctica fallback pair.
        pub fallbacks: usize,
        /// Granularity level the run used.
        pub granularity: GranularityLevel,
        /// Version of the GeoIP database that served the run.
        pub database_version: String,
        /// Elapsed time in seconds.
        pub elapsed_seconds: f64,
    }

    /// Runs connection enrichment with the provided configuration.
    ///
    /// This is the main entry point for the library. It opens the GeoIP
    /// database, resolves the granularity level once, then reads remote
    /// addresses from the input file (or stdin for `-`) and enriches a
    /// connection per address concurrently, printing the derived tags to
    /// stdout.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The input file cannot be opened
    /// - No GeoIP database can be located or opened
    pub async fn run_enrichment(config: Config) -> Result<EnrichReport> {
        let level = GranularityLevel::resolve(config.raw_granularity().as_deref());
        info!("GeoIP granularity level: {}", level);

        let database = init_geoip(config.geoip.as_deref(), config.cache_dir.as_deref())
            .await
            .context("Failed to initialize GeoIP database")?;
        let database_version = database.metadata().version.clone();

        let lookup: Arc<dyn GeoLookup> = database;
        let enricher = Arc::new(ConnectionEnricher::new(lookup, level));
        let stats = enricher.stats();

        let is_stdin = config.file.as_os_str() == "-";
        if is_stdin {
            info!("Reading addresses from stdin");
        }

        let mut stdin_lines = if is_stdin {
            Some(BufReader::new(tokio::io::stdin()).lines())
        } else {
            None
        };
        let mut file_lines = if !is_stdin {
            let file = tokio::fs::File::open(&config.file)
                .await
                .context("Failed to open input file")?;
            Some(BufReader::new(file).lines())
        } else {
            None
        };

        let start_time = std::time::Instant::now();
        let enriched = Arc::new(AtomicUsize::new(0));

        let cancel = CancellationToken::new();
        let cancel_logging = cancel.child_token();
        let enriched_for_logging = Arc::clone(&enriched);
        let logging_task = Some(tokio::task::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(LOGGING_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        log_progress(start_time, &enriched_for_logging);
                    }
                    _ = cancel_logging.cancelled() => {
                        break;
                    }
                }
            }
        }));

        let semaphore = init_semaphore(config.max_concurrency.max(1));
        let mut tasks = FuturesUnordered::new();

        loop {
            let line_result = if is_stdin {
                stdin_lines
                    .as_mut()
                    .expect("stdin_lines should be Some when is_stdin is true")
                    .next_line()
                    .await
            } else {
                file_lines
                    .as_mut()
                    .expect("file_lines should be Some when is_stdin is false")
                    .next_line()
                    .await
            };
            let line = match line_result {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read line from input: {e}");
                    continue;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Semaphore closed, skipping address: {trimmed}");
                    continue;
                }
            };

            let enricher = Arc::clone(&enricher);
            let enriched = Arc::clone(&enriched);
            let remote_addr = trimmed.to_string();
            let realname = config.realname.clone().unwrap_or_default();
            let output = config.output.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = permit;

                let mut conn = ConnectionState::new(remote_addr);
                conn.real_name = realname;
                enricher.enrich_connection(&mut conn);
                enriched.fetch_add(1, Ordering::SeqCst);

                println!("{}", format_connection_line(&conn, &output));
            }));
        }

        while let Some(task_result) = tasks.next().await {
            if let Err(join_error) = task_result {
                warn!("Enrichment task panicked: {:?}", join_error);
            }
        }

        shutdown_gracefully(cancel, logging_task).await;

        log_progress(start_time, &enriched);
        print_enrichment_statistics(&stats);

        let total_connections = stats.total_connections();
        let fallbacks = stats.total_fallbacks();

        // Release the database handle before reporting the run finished.
        match Arc::try_unwrap(enricher) {
            Ok(enricher) => enricher.close(),
            Err(_) => warn!("Enricher still shared at shutdown, skipping explicit release"),
        }

        Ok(EnrichReport {
            total_connections,
            fallbacks,
            granularity: level,
            database_version,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }

    /// Formats one enriched connection for stdout.
    ///
    /// Tag keys are sorted so output is deterministic under concurrency.
    fn format_connection_line(conn: &ConnectionState, output: &OutputFormat) -> String {
        let empty = crate::enrich::derive::TagSet::new();
        let tags = conn.tags.as_ref().unwrap_or(&empty);
        let mut sorted: Vec<(&String, &String)> = tags.iter().collect();
        sorted.sort_by_key(|(key, _)| key.as_str());

        match output {
            OutputFormat::Json => {
                let tags_json: serde_json::Map<String, serde_json::Value> = sorted
                    .iter()
                    .map(|(k, v)| ((*k).clone(), serde_json::Value::String((*v).clone())))
                    .collect();
                let mut object = serde_json::json!({
                    "remote_addr": conn.remote_addr,
                    "tags": tags_json,
                });
                if !conn.real_name.is_empty() {
                    object["real_name"] = serde_json::Value::String(conn.real_name.clone());
                }
                object.to_string()
            }
            OutputFormat::Text => {
                let mut line = conn.remote_addr.clone();
                for (key, value) in sorted {
                    line.push(' ');
                    line.push_str(key);
                    line.push('=');
                    line.push_str(value);
                }
                if !conn.real_name.is_empty() {
                    line.push_str(" realname=");
                    line.push_str(&conn.real_name);
                }
                line
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::enrich::derive::TagSet;

        fn conn_with_tags() -> ConnectionState {
            let mut tags = TagSet::new();
            tags.insert("geo/country-code".to_string(), "US".to_string());
            tags.insert("geo/city-name".to_string(), "Boston".to_string());
            let mut conn = ConnectionState::new("192.0.2.7");
            conn.tags = Some(tags);
            conn
        }

        #[test]
        fn test_format_text_line_sorted() {
            let line = format_connection_line(&conn_with_tags(), &OutputFormat::Text);
            assert_eq!(
                line,
                "192.0.2.7 geo/city-name=Boston geo/country-code=US"
            );
        }

        #[test]
        fn test_format_text_line_includes_realname() {
            let mut conn = conn_with_tags();
            conn.real_name = "user (US)".to_string();
            let line = format_connection_line(&conn, &OutputFormat::Text);
            assert!(line.ends_with("realname=user (US)"));
        }

        #[test]
        fn test_format_json_line() {
            let line = format_connection_line(&conn_with_tags(), &OutputFormat::Json);
            let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
            assert_eq!(parsed["remote_addr"], "192.0.2.7");
            assert_eq!(parsed["tags"]["geo/country-code"], "US");
            assert!(parsed.get("real_name").is_none());
        }

        #[test]
        fn test_format_handles_missing_tag_map() {
            let conn = ConnectionState::new("192.0.2.7");
            let line = format_connection_line(&conn, &OutputFormat::Text);
            assert_eq!(line, "192.0.2.7");
        }
    }
}
