//! Preset return values and the call log.
//!
//! Preset keys pair an operation with a canonical JSON rendering of its
//! positional argument tuple, so a preset registered with the same arguments
//! a call later uses is found verbatim. The call log records every invocation
//! with its actual named arguments, in call order, whether a preset or the
//! directory store served it.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::entry::SearchEntry;
use mockldap_core::{Error, LdapOutcome, Result};

/// The client operations the mock intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    /// `simple_bind_s`
    #[serde(rename = "simple_bind_s")]
    SimpleBind,
    /// `search_s`
    #[serde(rename = "search_s")]
    Search,
    /// `compare_s`
    #[serde(rename = "compare_s")]
    Compare,
    /// `add_s`
    #[serde(rename = "add_s")]
    Add,
    /// `delete_s`
    #[serde(rename = "delete_s")]
    Delete,
    /// `modify_s`
    #[serde(rename = "modify_s")]
    Modify,
    /// `rename_s`
    #[serde(rename = "rename_s")]
    Rename,
    /// `unbind_s`
    #[serde(rename = "unbind_s")]
    Unbind,
    /// `set_option`
    #[serde(rename = "set_option")]
    SetOption,
    /// `start_tls_s`
    #[serde(rename = "start_tls_s")]
    StartTls,
}

impl Operation {
    /// The method name of the mocked client API.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SimpleBind => "simple_bind_s",
            Self::Search => "search_s",
            Self::Compare => "compare_s",
            Self::Add => "add_s",
            Self::Delete => "delete_s",
            Self::Modify => "modify_s",
            Self::Rename => "rename_s",
            Self::Unbind => "unbind_s",
            Self::SetOption => "set_option",
            Self::StartTls => "start_tls_s",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCall {
    /// Which operation was invoked.
    pub operation: Operation,
    /// The actual named arguments of the call, defaults included.
    pub arguments: serde_json::Value,
}

/// Value shapes a preset can return, one per operation result type.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetValue {
    /// Success tuple for bind and the write operations.
    Outcome(LdapOutcome),
    /// Search result entries.
    Entries(Vec<SearchEntry>),
    /// Compare verdict.
    Verdict(bool),
}

/// A registered preset: either a value to return or an error to raise.
pub type Preset = std::result::Result<PresetValue, Error>;

impl PresetValue {
    pub(crate) fn into_outcome(self, operation: Operation) -> Result<LdapOutcome> {
        match self {
            Self::Outcome(outcome) => Ok(outcome),
            _ => Err(mismatch(operation, "an operation outcome")),
        }
    }

    pub(crate) fn into_entries(self, operation: Operation) -> Result<Vec<SearchEntry>> {
        match self {
            Self::Entries(entries) => Ok(entries),
            _ => Err(mismatch(operation, "search entries")),
        }
    }

    pub(crate) fn into_verdict(self, operation: Operation) -> Result<bool> {
        match self {
            Self::Verdict(verdict) => Ok(verdict),
            _ => Err(mismatch(operation, "a compare verdict")),
        }
    }
}

fn mismatch(operation: Operation, expected: &'static str) -> Error {
    Error::PresetMismatch {
        operation: operation.name().to_string(),
        expected,
    }
}

/// Preset return values keyed by operation and canonicalized arguments.
#[derive(Debug, Default)]
pub(crate) struct PresetRegistry {
    presets: HashMap<(Operation, String), Preset>,
}

impl PresetRegistry {
    /// Registers a preset, overwriting any prior registration for the same
    /// operation and arguments.
    pub fn insert<A: Serialize>(
        &mut self,
        operation: Operation,
        arguments: &A,
        preset: Preset,
    ) -> Result<()> {
        let key = canonicalize(arguments)?;
        info!(operation = %operation, arguments = %key, "registered preset return value");
        self.presets.insert((operation, key), preset);
        Ok(())
    }

    /// Looks up the preset for the actual arguments of a call.
    pub fn lookup<A: Serialize>(&self, operation: Operation, arguments: &A) -> Option<Preset> {
        let key = canonicalize(arguments).ok()?;
        let preset = self.presets.get(&(operation, key));
        if preset.is_some() {
            debug!(operation = %operation, "serving preset return value");
        }
        preset.cloned()
    }

    pub fn clear(&mut self) {
        self.presets.clear();
    }
}

/// Canonical JSON rendering of an argument tuple, used as the preset key.
pub(crate) fn canonicalize<A: Serialize>(arguments: &A) -> Result<String> {
    Ok(serde_json::to_string(arguments)?)
}

/// Ordered record of every call made since construction or the last reset.
#[derive(Debug, Default)]
pub(crate) struct CallLog {
    calls: Vec<RecordedCall>,
}

impl CallLog {
    pub fn record(&mut self, operation: Operation, arguments: serde_json::Value) {
        debug!(operation = %operation, %arguments, "recording call");
        self.calls.push(RecordedCall {
            operation,
            arguments,
        });
    }

    pub fn as_slice(&self) -> &[RecordedCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        self.calls.iter().map(|call| call.operation.name()).collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preset_round_trip() {
        let mut registry = PresetRegistry::default();
        registry
            .insert(
                Operation::Compare,
                &("cn=admin,dc=example", "userPassword", "secret"),
                Ok(PresetValue::Verdict(true)),
            )
            .unwrap();

        let preset = registry
            .lookup(
                Operation::Compare,
                &("cn=admin,dc=example", "userPassword", "secret"),
            )
            .unwrap();
        assert_eq!(preset, Ok(PresetValue::Verdict(true)));

        // different arguments miss
        assert!(registry
            .lookup(
                Operation::Compare,
                &("cn=admin,dc=example", "userPassword", "wrong"),
            )
            .is_none());
        // different operation misses
        assert!(registry
            .lookup(
                Operation::Delete,
                &("cn=admin,dc=example", "userPassword", "secret"),
            )
            .is_none());
    }

    #[test]
    fn later_registration_overwrites() {
        let mut registry = PresetRegistry::default();
        registry
            .insert(Operation::Delete, &("cn=x",), Ok(PresetValue::Verdict(true)))
            .unwrap();
        registry
            .insert(
                Operation::Delete,
                &("cn=x",),
                Err(Error::NoSuchObject("cn=x".to_string())),
            )
            .unwrap();

        let preset = registry.lookup(Operation::Delete, &("cn=x",)).unwrap();
        assert_eq!(preset, Err(Error::NoSuchObject("cn=x".to_string())));
    }

    #[test]
    fn preset_shape_mismatch_is_reported() {
        let err = PresetValue::Verdict(true)
            .into_entries(Operation::Search)
            .unwrap_err();
        assert!(matches!(err, Error::PresetMismatch { .. }));
    }

    #[test]
    fn call_log_preserves_order() {
        let mut log = CallLog::default();
        log.record(Operation::SimpleBind, json!({"who": "", "cred": ""}));
        log.record(Operation::Search, json!({"base": "dc=example"}));

        assert_eq!(log.len(), 2);
        assert_eq!(log.operation_names(), vec!["simple_bind_s", "search_s"]);
        assert_eq!(log.as_slice()[0].arguments["who"], "");

        log.clear();
        assert!(log.as_slice().is_empty());
    }
}
