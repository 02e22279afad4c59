//! # mockldap-core
//!
//! Shared error taxonomy and result types for the mockldap in-memory LDAP
//! test double.
//!
//! ## Modules
//!
//! - [`error`] - Error types mirroring the real client library's exception
//!   surface, with LDAP result code mapping
//! - [`codes`] - LDAP result code constants
//! - [`outcome`] - Success outcome tuples returned by write operations

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codes;
pub mod error;
pub mod outcome;

// Re-export commonly used types
pub use error::{Error, Result};
pub use outcome::LdapOutcome;
