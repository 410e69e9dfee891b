//! Glossa Logging
//!
//! Structured logging shared by the Glossa crates, controlled through the
//! `GLOSSA_*` environment variables.
//!
//! - Macros check an atomic level before formatting anything
//! - Hosts and tests can capture records in-process with [`install_sink`]
//! - [`init_log_bridge`] routes third-party `log` records through the same output
//!
//! ```rust
//! use glossa_log::{debug, info, warn};
//!
//! debug!("Loading dictionary");
//! info!("Active locale: {}", "fr");
//! warn!(target: "glossa::store", "Falling back to {}", "en");
//! ```
//!
//! # Environment Variables
//!
//! - `GLOSSA_DEBUG=1` - Shorthand for `GLOSSA_LOG_LEVEL=debug`
//! - `GLOSSA_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level (default `info`)
//! - `GLOSSA_LOG_FORMAT=pretty|json` - Output format (default `json`)
//! - `GLOSSA_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `GLOSSA_LOG_MODULE=1|0` - Include the log target

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::env;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Log level, from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Nothing is emitted
    Off = 5,
}

const LEVELS: [Level; 6] = [
    Level::Trace,
    Level::Debug,
    Level::Info,
    Level::Warn,
    Level::Error,
    Level::Off,
];

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warning" => Some(Level::Warn),
            "none" => Some(Level::Off),
            name => LEVELS.into_iter().find(|l| l.as_str().eq_ignore_ascii_case(name)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<::log::Level> for Level {
    fn from(level: ::log::Level) -> Self {
        match level {
            ::log::Level::Trace => Level::Trace,
            ::log::Level::Debug => Level::Debug,
            ::log::Level::Info => Level::Info,
            ::log::Level::Warn => Level::Warn,
            ::log::Level::Error => Level::Error,
        }
    }
}

/// Output format for emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `timestamp LEVEL [target] message`
    Pretty,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Output settings read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    level: Level,
    format: Format,
    timestamps: bool,
    show_target: bool,
}

impl Settings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| lookup(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let level = lookup("GLOSSA_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .or_else(|| flag("GLOSSA_DEBUG").filter(|debug| *debug).map(|_| Level::Debug))
            .unwrap_or(Level::Info);

        Self {
            level,
            format: lookup("GLOSSA_LOG_FORMAT")
                .and_then(|s| Format::parse(&s))
                .unwrap_or(Format::Json),
            timestamps: flag("GLOSSA_LOG_TIMESTAMPS").unwrap_or(true),
            show_target: flag("GLOSSA_LOG_MODULE").unwrap_or(true),
        }
    }
}

static LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static SETTINGS: Lazy<Settings> = Lazy::new(|| {
    let settings = Settings::from_lookup(|name| env::var(name).ok());
    LEVEL.store(settings.level as u8, Ordering::SeqCst);
    settings
});

static SINK: Lazy<RwLock<Option<Sink>>> = Lazy::new(|| RwLock::new(None));

/// Apply the environment settings now instead of on first output.
pub fn init() {
    Lazy::force(&SETTINGS);
}

/// Whether records at `level` are currently emitted.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LEVEL.load(Ordering::Relaxed)
}

/// Change the minimum level at runtime.
pub fn set_level(level: Level) {
    init();
    LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Switch to debug output, or back to the level configured by the environment.
pub fn set_debug(enabled: bool) {
    set_level(if enabled { Level::Debug } else { SETTINGS.level });
}

#[cfg(any(test, feature = "tracing"))]
fn max_level() -> Level {
    let value = LEVEL.load(Ordering::Relaxed);
    LEVELS.into_iter().find(|l| *l as u8 == value).unwrap_or(Level::Off)
}

/// A log record as delivered to a capture sink.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub level: Level,
    /// Usually the emitting module path, or `glossa::<component>`
    pub target: &'a str,
    pub message: &'a str,
}

/// In-process record consumer.
pub type Sink = Arc<dyn Fn(&Record<'_>) + Send + Sync>;

/// Install a sink that receives every emitted record, returning the previous one.
///
/// Records still go to stderr; the sink is an additional consumer.
pub fn install_sink(sink: Sink) -> Option<Sink> {
    SINK.write().replace(sink)
}

pub fn clear_sink() -> Option<Sink> {
    SINK.write().take()
}

/// Emit a record. Used by the macros, which check the level first.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if !is_level_enabled(level) {
        return;
    }
    let record = Record {
        level,
        target,
        message,
    };

    let sink = SINK.read().clone();
    if let Some(sink) = sink {
        sink(&record);
    }

    let line = match SETTINGS.format {
        Format::Pretty => pretty_line(&record, &SETTINGS),
        Format::Json => json_line(&record, &SETTINGS),
    };
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

fn pretty_line(record: &Record<'_>, settings: &Settings) -> String {
    let mut line = String::new();
    if settings.timestamps {
        line.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
    }
    line.push_str(&format!("{:5} ", record.level.as_str()));
    if settings.show_target && !record.target.is_empty() {
        line.push_str(&format!("[{}] ", record.target));
    }
    line.push_str(record.message);
    line
}

#[cfg(feature = "json")]
fn json_line(record: &Record<'_>, settings: &Settings) -> String {
    let mut entry = serde_json::Map::new();
    if settings.timestamps {
        entry.insert("timestamp".into(), chrono::Utc::now().to_rfc3339().into());
    }
    entry.insert("level".into(), record.level.as_str().into());
    if settings.show_target {
        entry.insert("target".into(), record.target.into());
    }
    entry.insert("message".into(), record.message.into());
    serde_json::Value::Object(entry).to_string()
}

#[cfg(not(feature = "json"))]
fn json_line(record: &Record<'_>, settings: &Settings) -> String {
    pretty_line(record, settings)
}

struct Bridge;

impl ::log::Log for Bridge {
    fn enabled(&self, metadata: &::log::Metadata<'_>) -> bool {
        is_level_enabled(metadata.level().into())
    }

    fn log(&self, record: &::log::Record<'_>) {
        if self.enabled(record.metadata()) {
            log(record.level().into(), record.target(), &record.args().to_string());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static BRIDGE: Bridge = Bridge;

/// Route records from the `log` facade through this crate's output.
///
/// Fails if another `log` backend is already installed.
pub fn init_log_bridge() -> Result<(), ::log::SetLoggerError> {
    init();
    ::log::set_logger(&BRIDGE).map(|()| ::log::set_max_level(::log::LevelFilter::Trace))
}

#[doc(hidden)]
#[macro_export]
macro_rules! __emit {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
    ($level:expr, $($arg:tt)+) => {
        $crate::__emit!($level, target: module_path!(), $($arg)+)
    };
}

/// Log at trace level; accepts an optional `target:` prefix.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__emit!($crate::Level::Trace, $($arg)+) };
}

/// Log at debug level; emitted when `GLOSSA_DEBUG=1` or the level allows it.
///
/// ```rust
/// use glossa_log::debug;
///
/// let locale = "de";
/// debug!("Fetching dictionary for {}", locale);
/// debug!(target: "glossa::store", "Cache hit for {}", locale);
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__emit!($crate::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__emit!($crate::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__emit!($crate::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__emit!($crate::Level::Error, $($arg)+) };
}

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! A `tracing` subscriber honouring the `GLOSSA_*` level.

    /// Create a tracing subscriber filtered at the current level.
    ///
    /// `RUST_LOG` takes precedence when set.
    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        super::init();
        let level = super::max_level().as_str().to_ascii_lowercase();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    // Tests below mutate process-wide level and sink state.
    static SERIAL: Mutex<()> = parking_lot::const_mutex(());

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse(" DEBUG "), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("verbose"), None);
        assert!(Level::Trace < Level::Error);
    }

    #[test]
    fn test_settings_from_environment() {
        let defaults = settings(&[]);
        assert_eq!(defaults.level, Level::Info);
        assert_eq!(defaults.format, Format::Json);
        assert!(defaults.timestamps && defaults.show_target);

        let debug = settings(&[("GLOSSA_DEBUG", "1"), ("GLOSSA_LOG_FORMAT", "Pretty")]);
        assert_eq!(debug.level, Level::Debug);
        assert_eq!(debug.format, Format::Pretty);

        let explicit = settings(&[("GLOSSA_DEBUG", "true"), ("GLOSSA_LOG_LEVEL", "warn")]);
        assert_eq!(explicit.level, Level::Warn);

        let unknown = settings(&[("GLOSSA_LOG_FORMAT", "xml"), ("GLOSSA_LOG_TIMESTAMPS", "0")]);
        assert_eq!(unknown.format, Format::Json);
        assert!(!unknown.timestamps);
    }

    #[test]
    fn test_line_formats() {
        let record = Record {
            level: Level::Warn,
            target: "glossa::store",
            message: "Falling back to en",
        };
        let quiet = settings(&[("GLOSSA_LOG_TIMESTAMPS", "0")]);
        assert_eq!(pretty_line(&record, &quiet), "WARN  [glossa::store] Falling back to en");

        #[cfg(feature = "json")]
        {
            let value: serde_json::Value = serde_json::from_str(&json_line(&record, &quiet)).unwrap();
            assert_eq!(value["level"], "WARN");
            assert_eq!(value["target"], "glossa::store");
            assert_eq!(value["message"], "Falling back to en");
            assert!(value.get("timestamp").is_none());
        }
    }

    #[test]
    fn test_set_debug_and_off() {
        let _serial = SERIAL.lock();
        init();

        set_level(Level::Warn);
        set_debug(true);
        assert_eq!(max_level(), Level::Debug);
        set_debug(false);
        assert_eq!(max_level(), SETTINGS.level);

        set_level(Level::Trace);
        assert!(!is_level_enabled(Level::Off));
        assert!(is_level_enabled(Level::Trace));
        set_level(SETTINGS.level);
    }

    #[test]
    fn test_sink_receives_enabled_records_only() {
        let _serial = SERIAL.lock();
        init();
        set_level(Level::Warn);

        let seen: Arc<Mutex<Vec<(Level, String, String)>>> = Arc::default();
        let captured = Arc::clone(&seen);
        install_sink(Arc::new(move |record: &Record<'_>| {
            captured.lock().push((
                record.level,
                record.target.to_string(),
                record.message.to_string(),
            ));
        }));

        info!("hidden");
        warn!(target: "glossa::test", "shown {}", 1);

        clear_sink();
        set_level(SETTINGS.level);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (Level::Warn, "glossa::test".to_string(), "shown 1".to_string()));
    }

    #[test]
    fn test_level_from_log_facade() {
        assert_eq!(Level::from(::log::Level::Warn), Level::Warn);
        assert_eq!(Level::from(::log::Level::Trace), Level::Trace);
    }
}
