//! Access-log sinks
//!
//! The responder and the server lifecycle report human-readable lines
//! (one per request, plus start/stop notices) through a [`LogSink`]. Sinks
//! must write each line whole and must never fail the caller.

use std::io::Write;
use std::sync::Mutex;

/// Destination for access-log lines.
pub trait LogSink: Send + Sync {
    /// Write one line. `line` carries no trailing newline.
    fn write_line(&self, line: &str);
}

/// Writes lines to standard output.
///
/// Each line is written under the stdout lock in a single `writeln!`, so
/// lines from concurrent requests never interleave. Write errors are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "{}", line);
        let _ = handle.flush();
    }
}

/// Keeps lines in memory, mostly for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
