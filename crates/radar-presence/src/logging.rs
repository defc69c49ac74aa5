//! Per-handle log configuration.
//!
//! Records go through `tracing`; which subscriber receives them is up to the
//! application. `LogConfig` only decides which records a detector handle
//! emits at all, so two handles (or two tests) can run with different
//! verbosity without touching global state.

use serde::{Deserialize, Serialize};
use tracing::Level;

/// Verbosity of one detector handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    /// Includes one record per processed frame.
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
}

impl LogConfig {
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// No records at all.
    #[must_use]
    pub fn off() -> Self {
        Self::new(LogLevel::Off)
    }

    /// Whether records at `level` should be emitted.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        let max = match self.level {
            LogLevel::Off => return false,
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        };
        // tracing orders levels by verbosity: ERROR < WARN < ... < TRACE
        level <= max
    }
}
