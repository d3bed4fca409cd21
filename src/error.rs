#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplError {
    #[error("{text}")]
    Thrown { text: String },

    #[error("The process has exited (code {code:?})")]
    ProcessExited { code: Option<i32> },

    #[error("Current interactive window is disconnected - please reset the process.")]
    Disconnected,

    #[error("Connection to the interactive process failed: {reason}")]
    Transport { reason: String },

    #[error("Submission cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Failed to start interactive process '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("save requires a filename")]
    MissingFilename,

    #[error("Invalid filename: {name}")]
    InvalidFilename { name: String },

    #[error("Failed to save: {reason}")]
    SaveFailed { reason: String },

    #[error("std::io error: {message}")]
    Io { message: String },
}

impl ReplError {
    /// Whether the error leaves the session unusable until a reset.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReplError::ProcessExited { .. } | ReplError::Disconnected | ReplError::Transport { .. } | ReplError::Spawn { .. }
        )
    }

    pub(crate) fn cancelled(reason: impl Into<String>) -> Self {
        ReplError::Cancelled { reason: reason.into() }
    }

    pub(crate) fn transport(reason: impl std::fmt::Display) -> Self {
        ReplError::Transport { reason: reason.to_string() }
    }
}

impl From<std::io::Error> for ReplError {
    fn from(err: std::io::Error) -> Self {
        ReplError::Io { message: err.to_string() }
    }
}

impl From<serde_json::Error> for ReplError {
    fn from(err: serde_json::Error) -> Self {
        ReplError::Protocol { message: err.to_string() }
    }
}

impl From<ReplError> for std::io::Error {
    fn from(err: ReplError) -> std::io::Error {
        std::io::Error::other(err.to_string())
    }
}
