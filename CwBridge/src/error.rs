//! Error types for `CwBridge`

use std::path::PathBuf;

use thiserror::Error;

/// Why a directory was rejected as a library root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathProblem {
    /// No path was given at all.
    Empty,
    /// The path does not name an existing directory.
    NotADirectory,
    /// The directory exists but does not hold the component file.
    ComponentMissing,
}

impl PathProblem {
    /// Get a human-readable description of this problem
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "no path given",
            Self::NotADirectory => "invalid folder",
            Self::ComponentMissing => "component not found",
        }
    }
}

/// The error type for `CwBridge` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Configuration Errors ====================
    /// The library root failed verification.
    #[error("{}: {}", problem.as_str(), path.display())]
    InvalidConfiguration {
        /// The rejected path (the component path when the file is missing).
        path: PathBuf,
        /// What was wrong with it.
        problem: PathProblem,
    },

    /// The platform loader rejected the component or one of its dependencies.
    #[error("failed to load {}: {message}", path.display())]
    LibraryLoad {
        /// The file that was being loaded.
        path: PathBuf,
        /// The loader's message.
        message: String,
    },

    // ==================== Library Surface Errors ====================
    /// A type expected under the component namespace is not exported.
    #[error("type {type_name} not found in component (library incompatible or outdated)")]
    TypeNotFound {
        /// Full dotted type name.
        type_name: String,
    },

    /// A member expected on an exported type is not exported.
    #[error("member {type_name}::{member} not found in component (library incompatible or outdated)")]
    MemberNotFound {
        /// Full dotted type name.
        type_name: String,
        /// Member name.
        member: String,
    },

    // ==================== Content Errors ====================
    /// The XML source could not be parsed.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// The component reported a failure while converting one input.
    #[error("{operation} failed: {message}")]
    Codec {
        /// The invoked member, e.g. `GameFiles.XmlRel::GetRel`.
        operation: String,
        /// The component's diagnostic, when it provides one.
        message: String,
    },

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Whether this error says the installed library cannot be used at all,
    /// as opposed to a problem with one input file.
    ///
    /// Fatal errors abort a batch; everything else is attributable to the
    /// file being processed.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration { .. }
                | Self::LibraryLoad { .. }
                | Self::TypeNotFound { .. }
                | Self::MemberNotFound { .. }
        )
    }
}

/// A specialized Result type for `CwBridge` operations.
pub type Result<T> = std::result::Result<T, Error>;
