use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Result, ZfsbeatError};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Command line adjustments applied on top of the `[logging]` section
#[derive(Debug, Default, Clone)]
pub struct LogOverrides {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
    /// Include thread ids, file and line in console output
    pub verbose_fields: bool,
}

/// Install the global subscriber.
///
/// Returns the file writer guard when `logging.file` is set; it must be kept
/// alive until the process exits or buffered lines are lost.
pub fn init_logging(config: &LoggingConfig, overrides: &LogOverrides) -> Result<Option<WorkerGuard>> {
    let level = overrides.level.as_deref().unwrap_or(&config.level);
    let format = overrides.format.unwrap_or(config.format);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("zfsbeat={}", level)))
        .map_err(|e| ZfsbeatError::initialization("logging", format!("invalid log level '{}': {}", level, e)))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.console {
        layers.push(format_layer(format, std::io::stdout, true, overrides.verbose_fields));
    }

    let guard = match &config.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            layers.push(format_layer(format, writer, false, true));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| ZfsbeatError::initialization("logging", e.to_string()))?;

    Ok(guard)
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool, verbose_fields: bool) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .with_thread_ids(verbose_fields)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(verbose_fields)
            .with_file(verbose_fields)
            .with_line_number(verbose_fields)
            .boxed(),
    }
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| {
            ZfsbeatError::initialization("logging", format!("log file '{}' has no file name", path.display()))
        })?
        .to_string_lossy()
        .into_owned();

    std::fs::create_dir_all(directory).map_err(|e| {
        ZfsbeatError::initialization("logging", format!("cannot create {}: {}", directory.display(), e))
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| ZfsbeatError::initialization("logging", e.to_string()))?;

    Ok(tracing_appender::non_blocking(appender))
}
