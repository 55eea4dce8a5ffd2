//! Structured logging and tracing for Telemirror
//!
//! Logs go to a daily rotated file and optionally to stdout, as plain text or
//! JSON. Components log through a `StructuredLogger` that prefixes every
//! message with its context fields.

use crate::config::LoggingConfig;
use crate::error::{MirrorError, Result};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::fmt;
use std::sync::Once;
use tracing::{Level, debug, error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable that disables the log file
pub const DISABLE_FILE_LOG_ENV: &str = "TELEMIRROR_DISABLE_FILE_LOG";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// Keep the non-blocking worker guard alive for the entire process lifetime
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static INIT_ONCE: Once = Once::new();
static INIT_ERROR: OnceCell<String> = OnceCell::new();

/// Initialize logging once; later calls return the first outcome
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    INIT_ONCE.call_once(|| {
        if let Err(e) = install(config) {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    match INIT_ERROR.get() {
        Some(err) => Err(MirrorError::config(err.clone())),
        None => Ok(()),
    }
}

fn install(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let console_only = cfg!(test) || std::env::var_os(DISABLE_FILE_LOG_ENV).is_some();

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if !console_only {
        let (writer, guard) = non_blocking(file_appender(config)?);
        let _ = LOG_GUARD.set(guard);
        layers.push(fmt_layer(writer, config.json_format, level));
    }
    if console_only || config.console_output {
        layers.push(fmt_layer(std::io::stdout, config.json_format, level));
    }

    let installed = tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter(level))
        .try_init();

    if console_only {
        // A subscriber may already be installed by a test harness
        drop(installed);
        info!("Logging initialized - level: {:?}, console-only", level);
    } else {
        installed.map_err(|e| MirrorError::config(e.to_string()))?;
        info!(
            "Logging initialized - level: {:?}, file: {}",
            level, config.file
        );
    }
    Ok(())
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("telemirror={},reqwest=warn,hyper=warn", level).into())
}

/// Daily rotated appender in the directory of `config.file`
fn file_appender(config: &LoggingConfig) -> Result<rolling::RollingFileAppender> {
    let path = Path::new(&config.file);
    let dir = if path.extension().is_some() {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    } else {
        path
    };

    rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix("telemirror")
        .filename_suffix("log")
        .max_log_files(config.backup_count.max(1) as usize)
        .build(dir)
        .map_err(|e| MirrorError::io(format!("Failed to create log file appender: {}", e)))
}

fn fmt_layer<W>(writer: W, json_format: bool, level: Level) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);
    let filter = LevelFilter::from_level(level);
    if json_format {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.with_filter(filter).boxed()
    }
}

/// Parse log level string to tracing Level
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" => Ok(Level::ERROR),
        _ => Err(MirrorError::config(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}

/// Fields attached to every message of a `StructuredLogger`
#[derive(Debug, Clone)]
pub struct LogContext {
    pub component: String,
    pub vehicle: Option<String>,
    /// Extra `key=value` pairs, rendered in key order
    pub extra_fields: BTreeMap<String, String>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            vehicle: None,
            extra_fields: BTreeMap::new(),
        }
    }

    pub fn with_vehicle(mut self, vehicle: String) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn with_field(mut self, key: &str, value: String) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component={}", self.component)?;
        if let Some(vehicle) = &self.vehicle {
            write!(f, ",vehicle={}", vehicle)?;
        }
        for (key, value) in &self.extra_fields {
            write!(f, ",{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Logger that tags each message with a fixed `LogContext`
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context: LogContext,
    fields: String,
}

macro_rules! log_with_fields {
    ($($(#[$doc:meta])* $name:ident => $mac:ident;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(&self, message: &str) {
                $mac!(fields = %self.fields, "{}", message);
            }
        )+
    };
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        let fields = context.to_string();
        Self { context, fields }
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    log_with_fields! {
        info => info;
        warn => warn;
        error => error;
        debug => debug;
        /// Per-request detail, off unless the level is TRACE
        trace => trace;
    }
}

/// Logger tagged with a component name only
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}
