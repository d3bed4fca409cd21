//! The display the evaluator writes to.
//!
//! The evaluator only ever appends text or clears; it never reads back.
//! Implementations must not call into the evaluator from `append`/`clear`,
//! since both are invoked while the session lock is held.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stream {
    #[serde(rename = "out")]
    Output,
    #[serde(rename = "err")]
    Error,
}

pub trait Surface: Send + Sync {
    fn append(&self, text: &str, stream: Stream);
    fn clear(&self);
}

/// An in-memory ledger of everything appended, in order.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    ledger: Arc<Mutex<Vec<(String, Stream)>>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended to `Output` since the last clear.
    pub fn output(&self) -> String {
        self.collect(Stream::Output)
    }

    /// Everything appended to `Error` since the last clear.
    pub fn error(&self) -> String {
        self.collect(Stream::Error)
    }

    pub fn entries(&self) -> Vec<(String, Stream)> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn collect(&self, stream: Stream) -> String {
        let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.iter().filter(|(_, s)| *s == stream).map(|(text, _)| text.as_str()).collect()
    }
}

impl Surface for MemorySurface {
    fn append(&self, text: &str, stream: Stream) {
        if text.is_empty() {
            return;
        }
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((text.to_string(), stream));
    }

    fn clear(&self) {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Writes straight to the process's stdout/stderr.
#[derive(Debug)]
pub struct TerminalSurface {
    at_line_start: AtomicBool,
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSurface {
    pub fn new() -> Self {
        TerminalSurface {
            at_line_start: AtomicBool::new(true),
        }
    }

    /// Results are appended without a trailing line break; call this before
    /// showing the next prompt.
    pub fn finish_line(&self) {
        if !self.at_line_start.swap(true, Ordering::SeqCst) {
            println!();
        }
    }
}

impl Surface for TerminalSurface {
    fn append(&self, text: &str, stream: Stream) {
        if text.is_empty() {
            return;
        }
        let result = match stream {
            Stream::Output => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes()).and_then(|_| out.flush())
            }
            Stream::Error => {
                let mut err = std::io::stderr().lock();
                err.write_all(text.as_bytes()).and_then(|_| err.flush())
            }
        };
        if let Err(e) = result {
            log::warn!("Failed to write to terminal: {e}");
        }
        self.at_line_start.store(text.ends_with('\n'), Ordering::SeqCst);
    }

    fn clear(&self) {
        print!("\x1b[2J\x1b[H");
        let _ = std::io::stdout().flush();
        self.at_line_start.store(true, Ordering::SeqCst);
    }
}
