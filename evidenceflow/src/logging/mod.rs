//! Leveled logging contract for pipelines.
//!
//! A [`Pipeline`](crate::pipeline::Pipeline) logs through a single
//! [`LogSink`]. The minimum-level gate lives in the trait's provided
//! [`log`](LogSink::log) method, so every sink inherits the same gating
//! behavior; implementations only see records that passed the gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Severity of a log message, from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Fine-grained tracing.
    Trace,
    /// Debugging detail.
    Debug,
    /// Informational messages.
    Information,
    /// Something unexpected but recoverable.
    Warning,
    /// An operation failed.
    Error,
    /// The pipeline cannot continue.
    Critical,
}

impl LogLevel {
    /// The lowercase name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Information => "information",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown log level name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level '{0}'")]
pub struct UnknownLogLevel(String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "information" => Ok(Self::Information),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(UnknownLogLevel(other.to_owned())),
        }
    }
}

/// A single entry passed to a [`LogSink`] after the level gate.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// When the message was logged.
    pub time: DateTime<Utc>,
    /// Message severity.
    pub level: LogLevel,
    /// The formatted message.
    pub message: String,
}

/// Contract for pipeline log sinks.
///
/// Sinks track a minimum level, `error` unless overridden; the provided
/// [`log`](LogSink::log) method drops anything below it before
/// [`write`](LogSink::write) is called.
pub trait LogSink: Send + Sync {
    /// The minimum level this sink accepts.
    fn min_level(&self) -> LogLevel {
        LogLevel::Error
    }

    /// Receives a record that passed the level gate.
    fn write(&self, record: &LogRecord);

    /// Logs a message, applying the level gate.
    fn log(&self, level: LogLevel, message: &str) {
        if level >= self.min_level() {
            self.write(&LogRecord {
                time: Utc::now(),
                level,
                message: message.to_owned(),
            });
        }
    }
}

/// A sink that discards everything.
///
/// Used as the default when no sink is configured; the level gate still
/// applies, at the default `error` threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogSink;

impl LogSink for NoOpLogSink {
    fn write(&self, _record: &LogRecord) {
        // Intentionally empty - discards all records
    }
}

/// A sink that forwards records to the `tracing` ecosystem.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogSink {
    min_level: LogLevel,
}

impl Default for TracingLogSink {
    fn default() -> Self {
        Self::new(LogLevel::Information)
    }
}

impl TracingLogSink {
    /// Creates a tracing-backed sink with the given minimum level.
    #[must_use]
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl LogSink for TracingLogSink {
    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn write(&self, record: &LogRecord) {
        match record.level {
            LogLevel::Trace => tracing::trace!("{}", record.message),
            LogLevel::Debug => tracing::debug!("{}", record.message),
            LogLevel::Information => tracing::info!("{}", record.message),
            LogLevel::Warning => tracing::warn!("{}", record.message),
            LogLevel::Error => tracing::error!("{}", record.message),
            LogLevel::Critical => {
                tracing::error!(level = "critical", "{}", record.message);
            }
        }
    }
}
