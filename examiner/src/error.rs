//! Error types for the harness.

/// Monolithic error type for the harness.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A test attempt was started while another one was still running on this thread.
    #[error("a test attempt is already in progress; attempts cannot be nested")]
    ReentrantAttempt,

    /// Command-line arguments could not be parsed.
    #[error("{0}")]
    Args(#[from] clap::Error),

    /// Writing report output failed.
    #[error("failed to write report output: {0}")]
    Io(#[from] std::io::Error),
}
