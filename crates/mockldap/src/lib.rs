//! In-memory stand-in for an LDAP client, for use in test suites.
//!
//! [`MockLdap`] intercepts the synchronous LDAP operations (`simple_bind_s`,
//! `search_s`, `compare_s`, `add_s`, `delete_s`, `modify_s`, `rename_s`),
//! maintains an in-memory tree of directory entries, and returns canned or
//! computed results. Simple operations are simulated against the tree; for
//! anything beyond the supported filter grammar, seed the mock with preset
//! return values via [`MockLdap::set_return_value`].
//!
//! Every call is recorded with its actual arguments and can be asserted on
//! afterwards through [`MockLdap::calls_made_with_arguments`].

#![deny(missing_docs)]

mod client;
mod directory;
mod dn;
mod entry;
mod filter;
mod registry;

pub use client::MockLdap;
pub use directory::{DirectoryStore, DirectoryTree, Mod, SearchScope};
pub use dn::{DistinguishedName, DistinguishedNameError, RelativeDistinguishedName};
pub use entry::{Attributes, SearchEntry};
pub use filter::{Filter, FilterError};
pub use registry::{Operation, Preset, PresetValue, RecordedCall};

pub use mockldap_core::{codes, Error, LdapOutcome};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = mockldap_core::Result<T>;
