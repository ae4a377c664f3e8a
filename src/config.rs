use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ZfsbeatConfig {
    pub beat: BeatConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BeatConfig {
    /// Beat name used in log lines and published events
    #[serde(default = "default_beat_name")]
    pub name: String,

    /// Glob pattern identifying the inputs to monitor
    #[serde(default)]
    pub path: String,

    /// Collection period in milliseconds
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Collect pool level state
    #[serde(default = "default_source_enabled")]
    pub source_zpool: bool,

    /// Collect filesystem datasets
    #[serde(default = "default_source_enabled")]
    pub source_filesystem: bool,

    /// Collect snapshot datasets
    #[serde(default = "default_source_enabled")]
    pub source_snapshot: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShutdownConfig {
    /// Upper bound for stopping the collector worker, in milliseconds
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Level for the zfsbeat target (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output format
    #[serde(default)]
    pub format: LogFormat,

    /// Write log lines to stdout
    #[serde(default = "default_console")]
    pub console: bool,

    /// Optional log file, written without ANSI colors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Data sources a collection cycle covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Zpool,
    Filesystem,
    Snapshot,
}

impl BeatConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn enabled_sources(&self) -> Vec<Source> {
        let mut sources = Vec::with_capacity(3);
        if self.source_zpool {
            sources.push(Source::Zpool);
        }
        if self.source_filesystem {
            sources.push(Source::Filesystem);
        }
        if self.source_snapshot {
            sources.push(Source::Snapshot);
        }
        sources
    }
}

impl ShutdownConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl ZfsbeatConfig {
    /// Load configuration from a specific file path
    ///
    /// The file is optional; values missing from it fall back to defaults
    /// and can be overridden with `ZFSBEAT_<SECTION>__<KEY>` variables.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("beat.name", default_beat_name())?
            .set_default("beat.path", "")?
            .set_default("beat.period_ms", default_period_ms() as i64)?
            .set_default("beat.source_zpool", default_source_enabled())?
            .set_default("beat.source_filesystem", default_source_enabled())?
            .set_default("beat.source_snapshot", default_source_enabled())?
            .set_default("shutdown.stop_timeout_ms", default_stop_timeout_ms() as i64)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", LogFormat::default().to_string())?
            .set_default("logging.console", default_console())?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(
                Environment::with_prefix("ZFSBEAT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ZfsbeatConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.beat.name.trim().is_empty() {
            return Err(ConfigError::Message(
                "beat.name must not be empty".to_string(),
            ));
        }

        if self.beat.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "beat.path is required: set a glob pattern of inputs to monitor".to_string(),
            ));
        }

        if let Err(e) = glob::Pattern::new(&self.beat.path) {
            return Err(ConfigError::Message(format!(
                "beat.path '{}' is not a valid glob pattern: {}",
                self.beat.path, e
            )));
        }

        if self.beat.period_ms == 0 {
            return Err(ConfigError::Message(
                "beat.period_ms must be greater than 0".to_string(),
            ));
        }

        if self.beat.enabled_sources().is_empty() {
            return Err(ConfigError::Message(
                "At least one of beat.source_zpool, beat.source_filesystem, beat.source_snapshot must be enabled"
                    .to_string(),
            ));
        }

        if self.shutdown.stop_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "shutdown.stop_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Message(format!(
                "logging.level '{}' is not one of trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Configuration printed by `--print-config`
    pub fn example() -> Self {
        let mut config = Self::default();
        config.beat.path = "/var/log/zfs/*".to_string();
        config.logging.file = Some(PathBuf::from("/var/log/zfsbeat/zfsbeat.log"));
        config
    }
}

impl Default for ZfsbeatConfig {
    fn default() -> Self {
        Self {
            beat: BeatConfig::default(),
            shutdown: ShutdownConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            name: default_beat_name(),
            path: String::new(),
            period_ms: default_period_ms(),
            source_zpool: default_source_enabled(),
            source_filesystem: default_source_enabled(),
            source_snapshot: default_source_enabled(),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            console: default_console(),
            file: None,
        }
    }
}

// Default value functions
fn default_beat_name() -> String {
    "zfsbeat".to_string()
}
fn default_period_ms() -> u64 {
    1000
}
fn default_source_enabled() -> bool {
    true
}

fn default_stop_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_console() -> bool {
    true
}
