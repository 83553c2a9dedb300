// crates/zonegate-core/src/runtime/telemetry.rs
// ============================================================================
// Module: Zonegate Telemetry and Alert Sinks
// Description: JSON-lines sinks for operational events and alert notices.
// Purpose: Provide default sink implementations for embedders and the CLI.
// Dependencies: serde_json, crate::interfaces
// ============================================================================

//! ## Overview
//! Sinks serialize each event as a single JSON line. Write failures never
//! fail the operation being observed; the ledger, not telemetry, is the
//! durable record. [`FileTelemetry`] counts the events it loses and reports
//! the first loss on stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::core::AlertNotice;
use crate::interfaces::AlertError;
use crate::interfaces::AlertSink;
use crate::interfaces::OperationEvent;
use crate::interfaces::TelemetrySink;

// ============================================================================
// SECTION: Telemetry Sinks
// ============================================================================

/// Telemetry sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _event: &OperationEvent) {}
}

/// Telemetry sink that writes JSON lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrTelemetry;

impl TelemetrySink for StderrTelemetry {
    fn record(&self, event: &OperationEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Telemetry sink that appends JSON lines to a file.
#[derive(Debug)]
pub struct FileTelemetry {
    /// Output file guarded for concurrent writers.
    file: Mutex<File>,
    /// Events lost to serialization or write failures.
    dropped: AtomicU64,
}

impl FileTelemetry {
    /// Opens (or creates) the telemetry file in append mode.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            dropped: AtomicU64::new(0),
        })
    }

    /// Returns how many events were lost to write failures.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Counts a lost event; the first loss is reported on stderr.
    fn note_drop(&self, reason: &str) {
        if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
            let _ = writeln!(io::stderr(), "telemetry file write failed, dropping events: {reason}");
        }
    }
}

impl TelemetrySink for FileTelemetry {
    fn record(&self, event: &OperationEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(err) => {
                self.note_drop(&err.to_string());
                return;
            }
        };
        let written = match self.file.lock() {
            Ok(mut file) => writeln!(file, "{payload}").and_then(|()| file.flush()),
            Err(_) => Err(io::Error::other("telemetry file mutex poisoned")),
        };
        if let Err(err) = written {
            self.note_drop(&err.to_string());
        }
    }
}

// ============================================================================
// SECTION: Alert Sinks
// ============================================================================

/// Alert sink that discards notices.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertSink;

impl AlertSink for NoopAlertSink {
    fn publish(&self, _notice: &AlertNotice) -> Result<(), AlertError> {
        Ok(())
    }
}

/// Alert sink that writes notices as JSON lines to stderr for a downstream formatter.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAlertSink;

impl AlertSink for StderrAlertSink {
    fn publish(&self, notice: &AlertNotice) -> Result<(), AlertError> {
        let payload =
            serde_json::to_string(notice).map_err(|err| AlertError::Publish(err.to_string()))?;
        writeln!(io::stderr(), "{payload}").map_err(|err| AlertError::Publish(err.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only assertions are permitted.")]

    use tempfile::NamedTempFile;

    use super::*;
    use crate::interfaces::OperationOutcome;

    #[test]
    fn file_telemetry_appends_one_json_line_per_event() {
        let file = NamedTempFile::new().expect("temp file");
        let sink = FileTelemetry::new(file.path()).expect("sink");
        for outcome in [OperationOutcome::Ok, OperationOutcome::Error] {
            sink.record(&OperationEvent {
                event: "zonegate_operation",
                timestamp_ms: 7,
                operation: "transition",
                zone_id: Some("Z1".to_string()),
                outcome,
                error_kind: None,
                detail: None,
            });
        }
        let contents = std::fs::read_to_string(file.path()).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[1]).expect("json");
        assert_eq!(parsed["outcome"], "error");
        assert_eq!(parsed["operation"], "transition");
        assert_eq!(sink.dropped_events(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn file_telemetry_counts_failed_writes() {
        let sink = FileTelemetry::new(Path::new("/dev/full")).expect("sink");
        for _ in 0..3 {
            sink.record(&OperationEvent {
                event: "zonegate_operation",
                timestamp_ms: 7,
                operation: "evaluate",
                zone_id: None,
                outcome: OperationOutcome::Ok,
                error_kind: None,
                detail: None,
            });
        }
        assert_eq!(sink.dropped_events(), 3);
    }
}
