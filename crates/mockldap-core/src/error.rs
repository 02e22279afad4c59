//! Error types for mock LDAP operations.
//!
//! Each variant corresponds to an exception class of the real LDAP client
//! library so that caller error-handling paths are exercised faithfully in
//! tests. Errors are never retried or swallowed internally; every operation
//! either returns a value or propagates one of these.

use thiserror::Error;

use crate::codes;

/// Main error type for mock LDAP operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bind credentials did not match the stored `userPassword`, or the bind
    /// DN does not exist
    #[error("invalid credentials for `{0}`")]
    InvalidCredentials(String),

    /// The targeted entry does not exist in the directory
    #[error("no such object: {0}")]
    NoSuchObject(String),

    /// A modification targeted an attribute the entry does not carry
    #[error("no such attribute: {0}")]
    NoSuchAttribute(String),

    /// An add or rename collided with an existing entry
    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    /// A distinguished name could not be parsed
    #[error("invalid DN syntax: {0}")]
    InvalidDnSyntax(String),

    /// A search filter could not be parsed
    #[error("bad search filter: {0}")]
    BadSearchFilter(String),

    /// The call cannot be satisfied from the in-memory directory and no
    /// preset return value was registered for it
    #[error("a preset return value is required for {operation}({arguments})")]
    PresetRequired {
        /// Operation that fell through
        operation: String,
        /// Canonicalized arguments of the call
        arguments: String,
    },

    /// A preset was registered with a value shape the operation cannot
    /// return (e.g. search entries stored for a bind)
    #[error("preset for {operation} has the wrong shape, expected {expected}")]
    PresetMismatch {
        /// Operation the preset was registered for
        operation: String,
        /// Value shape the operation expects
        expected: &'static str,
    },

    /// Internal mock failure, e.g. argument canonicalization
    #[error("internal error: {0}")]
    Internal(String),
}

/// Specialized result type for mock LDAP operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the LDAP protocol result code for this error, when one
    /// exists. Mock-internal conditions (`PresetRequired`, `PresetMismatch`,
    /// `Internal`) have no wire counterpart and yield `None`.
    #[must_use]
    pub const fn result_code(&self) -> Option<u16> {
        match self {
            Self::InvalidCredentials(_) => Some(codes::INVALID_CREDENTIALS),
            Self::NoSuchObject(_) => Some(codes::NO_SUCH_OBJECT),
            Self::NoSuchAttribute(_) => Some(codes::NO_SUCH_ATTRIBUTE),
            Self::AlreadyExists(_) => Some(codes::ENTRY_ALREADY_EXISTS),
            Self::InvalidDnSyntax(_) => Some(codes::INVALID_DN_SYNTAX),
            Self::BadSearchFilter(_) => Some(codes::FILTER_ERROR),
            Self::PresetRequired { .. } | Self::PresetMismatch { .. } | Self::Internal(_) => None,
        }
    }

    /// Returns true for conditions raised by the mock itself rather than
    /// simulated LDAP failures.
    #[must_use]
    pub const fn is_mock_internal(&self) -> bool {
        matches!(
            self,
            Self::PresetRequired { .. } | Self::PresetMismatch { .. } | Self::Internal(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("failed to canonicalize arguments: {err}"))
    }
}
