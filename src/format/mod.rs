//! Turning engine values into display text.

mod inspect;
pub use inspect::NodeInspector;

use crate::value::RemoteValue;

/// Line terminator used for everything written to the display.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Written to `Error` when the engine process goes away or is reset.
pub const PROCESS_EXITED_MESSAGE: &str = "The process has exited";

/// Written to `Error` for submissions made after the process has exited.
pub const DISCONNECTED_MESSAGE: &str = "Current interactive window is disconnected - please reset the process.\r\n";

/// Renders engine payloads as display text.
///
/// Implementations return text with `\r\n` line breaks, ready to append.
pub trait Formatter: Send + Sync {
    /// The value an evaluation completed with.
    fn format_result(&self, value: &RemoteValue) -> String;

    /// A value thrown by evaluated code. `text` is the engine's own string
    /// conversion of the thrown value.
    fn format_thrown(&self, value: &RemoteValue, text: &str) -> String;

    /// One console call, including its trailing line terminator.
    fn format_console(&self, args: &[RemoteValue]) -> String;
}

/// Convert lone `\n` line breaks to `\r\n`, leaving existing `\r\n` alone.
pub fn to_display_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for ch in text.chars() {
        if ch == '\n' && prev != Some('\r') {
            out.push('\r');
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}
