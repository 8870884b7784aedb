//! Step-by-step progress reporting.
//!
//! Every resolution step narrates what it is doing through a [`Reporter`]
//! handed to it by the caller. Groups bracket one logical operation
//! (computing a key, downloading one artifact) so CI log viewers can fold them.

use std::sync::{Mutex, PoisonError};

/// Sink for grouped progress lines.
pub trait Reporter: Send + Sync {
    /// Open a named group; subsequent lines belong to it.
    fn start_group(&self, name: &str);

    /// Emit an informational line.
    fn info(&self, line: &str);

    /// Emit a failure line.
    fn error(&self, line: &str);

    /// Close the current group.
    fn end_group(&self);
}

/// Reporter that forwards to `tracing`, tagging lines with the open group.
#[derive(Debug, Default)]
pub struct TracingReporter {
    group: Mutex<Option<String>>,
}

impl TracingReporter {
    /// Create a reporter with no open group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn current_group(&self) -> String {
        self.group
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }
}

impl Reporter for TracingReporter {
    fn start_group(&self, name: &str) {
        tracing::info!(group = %name, "begin");
        *self.group.lock().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
    }

    fn info(&self, line: &str) {
        tracing::info!(group = %self.current_group(), "{line}");
    }

    fn error(&self, line: &str) {
        tracing::error!(group = %self.current_group(), "{line}");
    }

    fn end_group(&self) {
        let closed = self
            .group
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(name) = closed {
            tracing::info!(group = %name, "end");
        }
    }
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn start_group(&self, _name: &str) {}
    fn info(&self, _line: &str) {}
    fn error(&self, _line: &str) {}
    fn end_group(&self) {}
}

/// One captured reporter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// `start_group(name)`
    StartGroup(String),
    /// `info(line)`
    Info(String),
    /// `error(line)`
    Error(String),
    /// `end_group()`
    EndGroup,
}

/// Reporter that keeps every call in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ReportEvent> {
        self.lock().clone()
    }

    /// Captured `info` lines, in order.
    #[must_use]
    pub fn info_lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Info(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    /// Captured `error` lines, in order.
    #[must_use]
    pub fn error_lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Error(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ReportEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: ReportEvent) {
        self.lock().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn start_group(&self, name: &str) {
        self.push(ReportEvent::StartGroup(name.to_string()));
    }

    fn info(&self, line: &str) {
        self.push(ReportEvent::Info(line.to_string()));
    }

    fn error(&self, line: &str) {
        self.push(ReportEvent::Error(line.to_string()));
    }

    fn end_group(&self) {
        self.push(ReportEvent::EndGroup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_reporter_keeps_order() {
        let reporter = RecordingReporter::new();
        reporter.start_group("Cache Key for x/y");
        reporter.info("==> Repository: x/y");
        reporter.error("boom");
        reporter.end_group();

        assert_eq!(
            reporter.events(),
            vec![
                ReportEvent::StartGroup("Cache Key for x/y".into()),
                ReportEvent::Info("==> Repository: x/y".into()),
                ReportEvent::Error("boom".into()),
                ReportEvent::EndGroup,
            ]
        );
        assert_eq!(reporter.info_lines(), ["==> Repository: x/y"]);
        assert_eq!(reporter.error_lines(), ["boom"]);
    }

    #[test]
    fn tracing_reporter_tracks_group() {
        let reporter = TracingReporter::new();
        reporter.start_group("Download x/y Artifact");
        assert_eq!(reporter.current_group(), "Download x/y Artifact");
        reporter.end_group();
        assert_eq!(reporter.current_group(), "");
    }
}
