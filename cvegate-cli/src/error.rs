//! CLI-specific error types and exit code mapping

use cvegate_cvefeed::CveFeedError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-facing message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid or missing command-line configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Dictionary loading failed (fatal only when nothing loaded).
    #[error("{0}")]
    Feed(#[from] CveFeedError),

    /// IO error (stdin read, stdout write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline task panicked or was cancelled.
    #[error("pipeline task failed: {0}")]
    Task(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | Fatal dictionary load / general error |
    /// | 2    | Configuration error                   |
    /// | 10   | IO error                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Feed(_) => 1,
            Self::Io(_) => 10,
            Self::Task(_) => 1,
        }
    }
}
