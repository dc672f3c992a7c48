//! Logging infrastructure - structured tracing throughout the layer
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels per module
//! - Zero-cost when disabled
//! - Console and optional file output via a non-blocking appender

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

mod macros;
pub use macros::*;

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Keeps the non-blocking file writer alive for the process lifetime
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Enable file logging
    pub file_output: bool,
    /// Log file path (if file_output enabled)
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: false,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // VELD_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("VELD_LOG_LEVEL") {
            config.level = match level_str.to_lowercase().as_str() {
                "trace" => Level::TRACE,
                "debug" => Level::DEBUG,
                "info" => Level::INFO,
                "warn" => Level::WARN,
                "error" => Level::ERROR,
                _ => Level::INFO,
            };
        }

        // VELD_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("VELD_LOG_FILE") {
            config.file_output = true;
            config.log_path = Some(path);
        }

        // VELD_LOG_JSON: enable JSON format
        config.json_format = std::env::var("VELD_LOG_JSON").is_ok();

        // VELD_LOG_SPANS: show span events
        config.show_spans = std::env::var("VELD_LOG_SPANS").is_ok();

        config
    }

    /// Create high-performance config (minimal logging)
    pub fn performance() -> Self {
        Self { level: Level::ERROR, ..Self::default() }
    }

    /// Create debug config (verbose logging)
    pub fn verbose() -> Self {
        Self {
            level: Level::TRACE,
            file_output: true,
            log_path: Some("veld_runtime.log".to_string()),
            json_format: false,
            show_spans: true,
        }
    }
}

/// Initialize logging with default configuration
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "veld_runtime={}",
                config.level.as_str().to_lowercase()
            ))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let console = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(io::stdout)
                .with_span_events(span_events)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(io::stdout)
                .with_span_events(span_events)
                .with_target(true)
                .with_thread_ids(cfg!(debug_assertions))
                .with_line_number(cfg!(debug_assertions))
                .boxed()
        };

        let file = config
            .log_path
            .as_deref()
            .filter(|_| config.file_output)
            .map(|raw| {
                let path = Path::new(raw);
                let dir = match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                let name = path
                    .file_name()
                    .map(|n| n.to_os_string())
                    .unwrap_or_else(|| "veld_runtime.log".into());
                let (writer, guard) =
                    tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
                let _ = FILE_GUARD.set(guard);
                fmt::layer().with_writer(writer).with_ansi(false).boxed()
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console)
            .with(file)
            .init();
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Layer-specific logging functions
// ============================================================================

/// Log scratch block allocation
#[inline]
pub fn log_scratch_alloc(size: usize, addr: usize) {
    use tracing::trace;
    trace!(
        event = "scratch_alloc",
        size_bytes = size,
        address = addr,
        "Scratch block allocated"
    );
}

/// Log scratch block release
#[inline]
pub fn log_scratch_release(addr: usize) {
    use tracing::trace;
    trace!(
        event = "scratch_release",
        address = addr,
        "Scratch block released"
    );
}

/// Log collection sweep completion
pub fn log_sweep_complete(duration_us: u64, reclaimed: usize, cycle: usize) {
    use tracing::debug;
    debug!(
        event = "sweep_complete",
        blocks_reclaimed = reclaimed,
        cycle = cycle,
        duration_us = duration_us,
        "Scratch sweep complete"
    );
}

/// Log native function invocation
pub fn log_native_call(name: &str, arg_count: usize) {
    use tracing::trace;
    trace!(
        event = "native_call",
        function = name,
        args = arg_count,
        "Native function invoked"
    );
}

/// Log a panic leaving a native function
pub fn log_native_panic(name: &str, kind: crate::panic::PanicKind) {
    use tracing::debug;
    debug!(
        event = "native_panic",
        function = name,
        kind = kind.label(),
        "Native function panicked"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.file_output);

        let perf_config = LogConfig::performance();
        assert_eq!(perf_config.level, Level::ERROR);

        let verbose_config = LogConfig::verbose();
        assert_eq!(verbose_config.level, Level::TRACE);
    }

    #[test]
    fn test_init_idempotent() {
        init_with_config(LogConfig::default());
        init_with_config(LogConfig::default()); // Should not panic
        assert!(is_initialized());
    }
}
