//! Progress events and the sink every component reports through
//!
//! Events are fire-and-forget: the sink pushes them onto an unbounded channel
//! and never retains them. The presentation layer owns the receiving end.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};
use log::warn;
use tokio::sync::mpsc;

/// How an event should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    /// A line from the build script's standard output
    BuildOutput,
    /// A line from the build script's standard error
    BuildError,
}

impl Severity {
    fn log_level(self) -> log::Level {
        match self {
            Severity::Warning => log::Level::Warn,
            Severity::Error | Severity::BuildError => log::Level::Error,
            Severity::Info | Severity::Success | Severity::BuildOutput => log::Level::Info,
        }
    }
}

/// One immutable log line
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub timestamp: DateTime<Local>,
    pub text: String,
    pub severity: Severity,
}

impl ProgressEvent {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            text: text.into(),
            severity,
        }
    }

    /// `[HH:MM:SS] text`, with build lines tagged by stream
    pub fn render(&self) -> String {
        let stamp = self.timestamp.format("%H:%M:%S");
        match self.severity {
            Severity::BuildOutput => format!("[{stamp}] BUILD: {}", self.text),
            Severity::BuildError => format!("[{stamp}] ERROR: {}", self.text),
            _ => format!("[{stamp}] {}", self.text),
        }
    }
}

/// Cloneable handle for emitting progress events
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
    disabled: Arc<AtomicBool>,
}

impl ProgressSink {
    /// Create a sink together with the receiver the presentation layer drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx: Some(tx),
            disabled: Arc::new(AtomicBool::new(false)),
        };
        (sink, rx)
    }

    /// A sink with no consumer; events only reach the `log` facade
    pub fn silent() -> Self {
        Self {
            tx: None,
            disabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Emit an event. Every event is mirrored to the `log` facade under the
    /// `events` target, so a headless run can still record the full trace.
    pub fn emit(&self, severity: Severity, text: impl Into<String>) {
        let event = ProgressEvent::new(severity, text);
        log::log!(target: "events", severity.log_level(), "{}", event.text);

        if self.disabled.load(Ordering::Relaxed) {
            return;
        }
        if let Some(tx) = &self.tx
            && tx.send(event).is_err()
        {
            warn!("Progress receiver dropped, continuing without live updates");
            self.disabled.store(true, Ordering::Relaxed);
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.emit(Severity::Info, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.emit(Severity::Success, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.emit(Severity::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(Severity::Error, text);
    }

    pub fn build_output(&self, text: impl Into<String>) {
        self.emit(Severity::BuildOutput, text);
    }

    pub fn build_error(&self, text: impl Into<String>) {
        self.emit(Severity::BuildError, text);
    }
}
