//! Tests for CLI argument parsing.

use clap::Parser;
use geotag::{Config, OutputFormat};
use std::path::PathBuf;

#[test]
fn test_minimal_invocation() {
    let config = Config::try_parse_from(["geotag", "addrs.txt"]).unwrap();
    assert_eq!(config.file, PathBuf::from("addrs.txt"));
    assert!(config.geoip.is_none());
    assert!(config.cache_dir.is_none());
}

#[test]
fn test_all_flags() {
    let config = Config::try_parse_from([
        "geotag",
        "addrs.txt",
        "--geoip",
        "/data/GeoLite2-City.mmdb",
        "--granularity",
        "3",
        "--realname",
        "user (%country)",
        "--max-concurrency",
        "64",
        "--cache-dir",
        "/tmp/geo-cache",
        "--output",
        "json",
        "--log-level",
        "debug",
        "--log-format",
        "json",
    ])
    .unwrap();

    assert_eq!(config.geoip.as_deref(), Some("/data/GeoLite2-City.mmdb"));
    assert_eq!(config.granularity.as_deref(), Some("3"));
    assert_eq!(config.realname.as_deref(), Some("user (%country)"));
    assert_eq!(config.max_concurrency, 64);
    assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/geo-cache")));
    assert_eq!(config.output, OutputFormat::Json);
}

#[test]
fn test_granularity_is_passed_through_raw() {
    // The flag accepts any string; unrecognized values fail open to full
    // granularity at resolution time, not at parse time.
    let config =
        Config::try_parse_from(["geotag", "addrs.txt", "--granularity", "bogus"]).unwrap();
    assert_eq!(config.granularity.as_deref(), Some("bogus"));
}

#[test]
fn test_invalid_output_format_rejected() {
    assert!(Config::try_parse_from(["geotag", "addrs.txt", "--output", "xml"]).is_err());
}

#[test]
fn test_invalid_log_level_rejected() {
    assert!(Config::try_parse_from(["geotag", "addrs.txt", "--log-level", "loud"]).is_err());
}

#[test]
fn test_file_argument_required() {
    assert!(Config::try_parse_from(["geotag"]).is_err());
}
