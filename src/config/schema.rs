//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::fs::OpenOptions;
use std::io;
use std::net::AddrParseError;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::net::{NetAddr, StreamLayerOptions};
use crate::observability::LogSink;
use crate::transport::TransportOptions;

/// Root configuration for a cluster node's transport.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Listener, advertise and pool settings.
    pub transport: TransportConfig,

    /// Log level and destination.
    pub logging: LoggingConfig,

    /// Metrics exposition.
    pub observability: ObservabilityConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Address the node binary binds its listener to (e.g., "0.0.0.0:7000").
    pub bind_address: String,

    /// Address peers dial. Defaults to the listener's bound address.
    pub advertise_address: Option<String>,

    /// Idle connections kept per peer.
    pub max_pool: usize,

    /// Dial timeout in milliseconds.
    pub timeout_ms: u64,

    /// Reject wildcard advertise addresses.
    pub validate_advertise_address: bool,

    /// Let the transport close the listener on shutdown.
    pub owns_listener: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:7000".to_string(),
            advertise_address: None,
            max_pool: 3,
            timeout_ms: 10_000,
            validate_advertise_address: true,
            owns_listener: false,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn advertise(&self) -> Result<Option<NetAddr>, AddrParseError> {
        self.advertise_address
            .as_deref()
            .map(str::parse::<NetAddr>)
            .transpose()
    }

    pub fn stream_options(&self) -> StreamLayerOptions {
        StreamLayerOptions {
            validate_advertise_address: self.validate_advertise_address,
            owns_listener: self.owns_listener,
        }
    }

    /// Factory options with the given log sink.
    pub fn options(&self, log_sink: LogSink) -> TransportOptions {
        TransportOptions::new(self.max_pool, self.timeout())
            .with_log_sink(log_sink)
            .with_stream_options(self.stream_options())
    }
}

/// Where transport log events go.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogSinkConfig {
    /// The process-wide tracing subscriber.
    #[default]
    Tracing,
    /// Plain text on stderr.
    Stderr,
    /// Plain text appended to a file.
    File(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    pub sink: LogSinkConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            sink: LogSinkConfig::Tracing,
        }
    }
}

impl LoggingConfig {
    /// Open the configured sink. Writer sinks are capped at `level`.
    pub fn log_sink(&self) -> io::Result<LogSink> {
        let level: LevelFilter = self
            .level
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let sink = match &self.sink {
            LogSinkConfig::Tracing => LogSink::Logger,
            LogSinkConfig::Stderr => LogSink::writer(io::stderr()),
            LogSinkConfig::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                LogSink::writer(file)
            }
        };
        Ok(sink.with_level(level))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_sink_takes_configured_level() {
        let logging = LoggingConfig {
            level: "warn".into(),
            sink: LogSinkConfig::Stderr,
        };
        match logging.log_sink().unwrap() {
            LogSink::Writer { level, .. } => assert_eq!(level, LevelFilter::WARN),
            other => panic!("unexpected sink: {other:?}"),
        }
    }

    #[test]
    fn unknown_level_is_rejected() {
        let logging = LoggingConfig {
            level: "loud".into(),
            sink: LogSinkConfig::Stderr,
        };
        assert_eq!(logging.log_sink().unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }
}
