//! Logging of the peer process.
//!
//! Stdout belongs to the console, so every log line goes to stderr. The binary wraps
//! the whole run in a `peer` span carrying the peer id, and the fmt layer prints it
//! in front of each event.
use std::str::FromStr;

use backtrace::Backtrace;
use clap::ValueEnum;
use tracing_log::LogTracer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::error::Error;

/// Verbosity of the stderr log.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter letting events of this level and above through.
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| Error::InvalidLoggingLevel(s.to_string()))
    }
}

/// Report panics through tracing, inside the span that panicked, so a crashing peer
/// still leaves its id and a backtrace in the log.
pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        let location = panic
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default();
        tracing::error!(
            location = %location,
            "{}\n{:?}",
            panic,
            Backtrace::new()
        );
    }));
}

/// Install the global subscriber. Calling it twice is harmless, the second subscriber
/// is ignored.
pub fn init_logging(level: LogLevel) {
    set_panic_hook();

    let subscriber = Registry::default().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(level.filter()),
    );
    // Forward `log` records of dependencies, a second init fails and is ignored.
    let _ = LogTracer::init();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
