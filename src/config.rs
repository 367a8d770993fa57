use std::path::PathBuf;

use clap::{Parser, ValueEnum};

// constants (used as defaults)
/// Seconds between progress log lines.
pub const LOGGING_INTERVAL_SECS: u64 = 5;
/// Default number of connections enriched concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;

/// Environment variable carrying the granularity setting, used when the
/// `--granularity` flag is absent.
pub const GRANULARITY_ENV: &str = "GEOIP_GRANULARITY";

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to
/// most verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Per-connection output format on stdout.
///
/// - `Text`: one `address key=value ...` line per connection
/// - `Json`: one JSON object per connection
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field
/// attributes. All options have sensible defaults and can be overridden via
/// command-line flags.
///
/// # Examples
///
/// ```bash
/// # Enrich addresses from a file with full granularity
/// geotag addrs.txt
///
/// # Country-level tags only, explicit database
/// geotag addrs.txt --granularity country --geoip ./GeoLite2-City.mmdb
///
/// # Stream addresses on stdin, JSON output
/// cat addrs.txt | geotag - --output json
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "geotag",
    about = "Enriches connection addresses with GeoIP-derived location tags."
)]
pub struct Config {
    /// File of remote addresses to enrich, one per line (`-` for stdin).
    /// Blank lines and lines starting with `#` are skipped.
    #[arg(value_parser)]
    pub file: PathBuf,

    /// GeoIP database path (MaxMind GeoLite2-City .mmdb file).
    /// If not provided, a GeoLite2-City.mmdb next to the executable is
    /// used, else an automatic download if MAXMIND_LICENSE_KEY is set.
    #[arg(long)]
    pub geoip: Option<String>,

    /// Granularity level: 1-5 or timezone|country|subdivision|city|postal.
    /// Falls back to the GEOIP_GRANULARITY environment variable, then to
    /// full granularity. Unrecognized values fail open to full granularity.
    #[arg(long)]
    pub granularity: Option<String>,

    /// Realname template applied to every connection; `%country` expands to
    /// the derived country code.
    #[arg(long)]
    pub realname: Option<String>,

    /// Maximum concurrent enrichments
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Cache directory for auto-downloaded databases
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Per-connection output format: text|json
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Config {
    /// The raw granularity setting: the CLI flag if given, else the
    /// `GEOIP_GRANULARITY` environment variable.
    pub fn raw_granularity(&self) -> Option<String> {
        self.granularity
            .clone()
            .or_else(|| std::env::var(GRANULARITY_ENV).ok())
    }
}
