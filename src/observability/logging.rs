//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide subscriber
//! - Model the transport's log destination as a single option
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via config and environment (`RUST_LOG` wins)
//! - A writer sink gets its own subscriber; call sites are identical for both sinks

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `default_level` is used when `RUST_LOG` is unset.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("raft_stream_transport={default_level},raft_stream_node={default_level}").into());

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        // Only fails when a global subscriber exists, so this still lands somewhere.
        tracing::warn!(error = %e, "Global subscriber already installed, keeping it");
    }
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// One write through the shared writer. Handed out per event by the subscriber.
struct SinkGuard(SharedWriter);

impl Write for SinkGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }
}

/// Destination for transport log events.
#[derive(Clone, Default)]
pub enum LogSink {
    /// Plain-text lines written to the given writer, up to `level`.
    Writer { writer: SharedWriter, level: LevelFilter },
    /// Whatever subscriber is current when the transport is built.
    #[default]
    Logger,
}

impl LogSink {
    /// Writer sink recording `DEBUG` and above. See [`LogSink::with_level`].
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        LogSink::Writer {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            level: LevelFilter::DEBUG,
        }
    }

    /// Cap a writer sink at `level`. The logger sink follows its subscriber's
    /// own filter and is returned unchanged.
    pub fn with_level(self, level: LevelFilter) -> Self {
        match self {
            LogSink::Writer { writer, .. } => LogSink::Writer { writer, level },
            LogSink::Logger => LogSink::Logger,
        }
    }

    /// Resolve the sink to a dispatcher. Must be called where the caller's
    /// subscriber is current when using [`LogSink::Logger`].
    pub fn dispatch(&self) -> Dispatch {
        match self {
            LogSink::Writer { writer, level } => {
                let writer = Arc::clone(writer);
                let subscriber = tracing_subscriber::fmt()
                    .with_writer(move || SinkGuard(Arc::clone(&writer)))
                    .with_ansi(false)
                    .with_max_level(*level)
                    .finish();
                Dispatch::new(subscriber)
            }
            LogSink::Logger => tracing::dispatcher::get_default(Dispatch::clone),
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSink::Writer { level, .. } => f.debug_struct("LogSink::Writer").field("level", level).finish(),
            LogSink::Logger => f.write_str("LogSink::Logger"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_sink_receives_events() {
        let capture = Capture::default();
        let dispatch = LogSink::writer(capture.clone()).dispatch();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(peer = "10.0.0.5:9000", "Dialed peer");
        });

        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("Dialed peer"), "{out}");
        assert!(out.contains("peer=\"10.0.0.5:9000\""), "{out}");
    }

    #[test]
    fn writer_sink_honours_level() {
        let capture = Capture::default();
        let dispatch = LogSink::writer(capture.clone())
            .with_level(LevelFilter::WARN)
            .dispatch();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::debug!("Dialed peer");
            tracing::warn!("Failed to accept connection");
        });

        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(!out.contains("Dialed peer"), "{out}");
        assert!(out.contains("Failed to accept connection"), "{out}");
    }

    #[test]
    fn logger_sink_ignores_level() {
        assert!(matches!(LogSink::Logger.with_level(LevelFilter::ERROR), LogSink::Logger));
    }

    #[test]
    fn init_twice_keeps_first_subscriber() {
        init("info");
        // Second install fails; it must be reported, not panic.
        init("debug");
    }
}
