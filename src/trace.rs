// src/trace.rs
//
// =============================================================================
// DECKHAND: ACTION TRACE (v 0.1 )
// =============================================================================
//
// The Audit Trail.
//
// A thread-safe line buffer that records every state-changing deck command
// in call order. It decouples trace generation (simulator) from rendering
// (CLI echo / test assertions): the buffer always fills, the echo is
// optional.
//
// When echoing, each line is prefixed with an ellipsis marker and can be
// rate-limited by a fixed delay so a human can follow a run in real time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Prefix for echoed trace lines, matching the pacing dots a live robot
/// console prints between actions.
const ECHO_MARKER: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EchoMode {
    Silent,
    Stdout { delay: Option<Duration> },
}

#[derive(Debug, Clone)]
pub struct TraceLog {
    lines: Arc<Mutex<Vec<String>>>,
    echo: EchoMode,
}

impl TraceLog {
    /// Buffer-only trace. Used by tests and by callers that render the
    /// lines themselves.
    pub fn silent() -> Self {
        Self {
            lines: Arc::new(Mutex::new(Vec::new())),
            echo: EchoMode::Silent,
        }
    }

    /// Trace that also echoes each line to stdout as it is recorded.
    /// `delay` inserts a fixed pause after every line.
    pub fn stdout(delay: Option<Duration>) -> Self {
        Self {
            lines: Arc::new(Mutex::new(Vec::new())),
            echo: EchoMode::Stdout { delay },
        }
    }

    /// Appends one line. Ordering is exactly call order; this is the
    /// simulator's entire observable output.
    pub fn record(&self, line: impl Into<String>) {
        let line = line.into();
        if let EchoMode::Stdout { delay } = self.echo {
            println!("{} {}", ECHO_MARKER, line);
            if let Some(pause) = delay {
                std::thread::sleep(pause);
            }
        }
        self.lines.lock().unwrap().push(line);
    }

    /// Snapshot of everything recorded so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
