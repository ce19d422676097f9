//! Error types for `QuickGen`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `QuickGen` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== Bridge Errors ====================
    /// The component could not be configured, loaded, or bound.
    #[error("CwBridge error: {0}")]
    Bridge(#[from] cwbridge::Error),

    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Invocation Errors ====================
    /// The source directory does not exist.
    #[error("Sources path does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// No valid CodeWalker path was given at the prompt.
    #[error("No CodeWalker path configured")]
    NotConfigured,

    // ==================== Batch Errors ====================
    /// A job failed in a way that rules out the remaining jobs.
    #[error("Batch aborted at {job}: {source}")]
    BatchAborted {
        /// Output name of the job that failed.
        job: String,
        /// The fatal bridge error.
        #[source]
        source: cwbridge::Error,
    },
}

impl Error {
    /// Whether the operator asked for something that cannot run, as opposed
    /// to the run itself failing.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::SourceNotFound(_))
    }
}

/// A specialized Result type for `QuickGen` operations.
pub type Result<T> = std::result::Result<T, Error>;
