//! The mock LDAP client.
//!
//! [`MockLdap`] stands in for both the client library module and its
//! connection object. It stays deliberately simple: simple operations are
//! computed from the in-memory tree, and anything beyond that is served from
//! preset return values registered per operation and argument tuple. Every
//! call lands in the call log first, so test assertions see the real call
//! history regardless of how the result was produced.

use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

use crate::directory::{DirectoryStore, DirectoryTree, Mod, SearchScope};
use crate::entry::{Attributes, SearchEntry};
use crate::filter::{Filter, FilterError};
use crate::registry::{canonicalize, CallLog, Operation, Preset, PresetRegistry, RecordedCall};
use crate::Result;
use mockldap_core::{Error, LdapOutcome};

/// In-memory stand-in for an LDAP client connection.
///
/// Construct one per test (optionally seeded with a directory tree), hand it
/// to the code under test in place of the real client, and assert on the
/// recorded calls afterwards. Call [`MockLdap::reset`] between test cases
/// when sharing an instance.
#[derive(Debug, Default)]
pub struct MockLdap {
    store: DirectoryStore,
    presets: PresetRegistry,
    log: CallLog,
    options: BTreeMap<String, serde_json::Value>,
    tls_enabled: bool,
}

impl MockLdap {
    /// Creates a mock with an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock seeded with the given directory tree, mapping DN
    /// strings to attribute maps. [`MockLdap::reset`] restores this tree.
    #[must_use]
    pub fn with_directory(tree: DirectoryTree) -> Self {
        Self {
            store: DirectoryStore::with_tree(tree),
            ..Self::default()
        }
    }

    /// Registers a preset result for an operation and argument tuple,
    /// overwriting any prior registration for the same key. When the
    /// operation is later invoked with exactly these arguments, the preset
    /// value is returned (or the preset error raised) instead of consulting
    /// the directory.
    ///
    /// The argument tuple must match the operation's call shape:
    /// `(who, cred)` for bind, `(base, scope, filterstr, attrlist)` for
    /// search, `(dn, attr, value)` for compare, `(dn, record)` for add,
    /// `dn` for delete, `(dn, mod_list)` for modify, and
    /// `(dn, newrdn, superior)` for rename.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] when the arguments cannot be
    /// canonicalized.
    pub fn set_return_value<A: Serialize>(
        &mut self,
        operation: Operation,
        arguments: &A,
        preset: Preset,
    ) -> Result<()> {
        self.presets.insert(operation, arguments, preset)
    }

    /// Returns every call made since construction or the last reset, in
    /// order, with the actual arguments used.
    #[must_use]
    pub fn calls_made_with_arguments(&self) -> &[RecordedCall] {
        self.log.as_slice()
    }

    /// Returns just the operation names called, in order.
    #[must_use]
    pub fn operations_called(&self) -> Vec<&'static str> {
        self.log.operation_names()
    }

    /// Clears the call log, preset table, options, and TLS flag, and
    /// restores the directory tree to its originally seeded contents.
    pub fn reset(&mut self) {
        info!("resetting mock ldap state");
        self.log.clear();
        self.presets.clear();
        self.options.clear();
        self.tls_enabled = false;
        self.store.reset();
    }

    /// Borrows the current directory tree.
    #[must_use]
    pub fn directory(&self) -> &DirectoryTree {
        self.store.tree()
    }

    /// Returns the entry stored under `dn`, matching case-insensitively.
    #[must_use]
    pub fn entry(&self, dn: &str) -> Option<&Attributes> {
        self.store.entry(dn)
    }

    /// Returns true once `start_tls_s` has been called.
    #[must_use]
    pub const fn tls_enabled(&self) -> bool {
        self.tls_enabled
    }

    /// Returns the value previously stored via `set_option`.
    #[must_use]
    pub fn option(&self, option: &str) -> Option<&serde_json::Value> {
        self.options.get(option)
    }

    //
    // Mocked client operations
    //

    /// Binds as `who` with credential `cred`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] on mismatch or unknown DN; an
    /// empty DN and credential is an anonymous bind and succeeds.
    pub fn simple_bind_s(&mut self, who: &str, cred: &str) -> Result<LdapOutcome> {
        self.log
            .record(Operation::SimpleBind, json!({ "who": who, "cred": cred }));

        if let Some(preset) = self.presets.lookup(Operation::SimpleBind, &(who, cred)) {
            return preset?.into_outcome(Operation::SimpleBind);
        }
        self.store.bind(who, cred)
    }

    /// Searches `base` with the given scope and filter, optionally
    /// restricting returned attributes to `attrlist`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] for a base-scope search of an absent
    /// DN, [`Error::BadSearchFilter`] for a malformed filter, and
    /// [`Error::PresetRequired`] for well-formed filter constructs outside
    /// the supported grammar when no preset matches.
    pub fn search_s(
        &mut self,
        base: &str,
        scope: SearchScope,
        filterstr: &str,
        attrlist: Option<&[&str]>,
    ) -> Result<Vec<SearchEntry>> {
        self.log.record(
            Operation::Search,
            json!({
                "base": base,
                "scope": scope,
                "filterstr": filterstr,
                "attrlist": attrlist,
            }),
        );

        let arguments = (base, scope, filterstr, attrlist);
        if let Some(preset) = self.presets.lookup(Operation::Search, &arguments) {
            return preset?.into_entries(Operation::Search);
        }

        // well-formed constructs we do not evaluate need a preset; malformed
        // input is the caller's bug
        if let Err(err) = Filter::parse(filterstr) {
            return Err(match err {
                FilterError::UnsupportedOperator { .. } => Error::PresetRequired {
                    operation: Operation::Search.name().to_string(),
                    arguments: canonicalize(&arguments)?,
                },
                other => other.into(),
            });
        }

        self.store.search(base, scope, filterstr, attrlist)
    }

    /// True if `attr` on entry `dn` contains `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] when `dn` is absent.
    pub fn compare_s(&mut self, dn: &str, attr: &str, value: &str) -> Result<bool> {
        self.log.record(
            Operation::Compare,
            json!({ "dn": dn, "attr": attr, "value": value }),
        );

        if let Some(preset) = self.presets.lookup(Operation::Compare, &(dn, attr, value)) {
            return preset?.into_verdict(Operation::Compare);
        }
        self.store.compare(dn, attr, value)
    }

    /// Inserts a new entry built from the attribute-value `record`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] when `dn` is present and
    /// [`Error::InvalidDnSyntax`] when it cannot be parsed.
    pub fn add_s(&mut self, dn: &str, record: &[(&str, &[&str])]) -> Result<LdapOutcome> {
        self.log
            .record(Operation::Add, json!({ "dn": dn, "record": record }));

        if let Some(preset) = self.presets.lookup(Operation::Add, &(dn, record)) {
            return preset?.into_outcome(Operation::Add);
        }
        let msgid = self.log.len() as u64;
        self.store.add(dn, record, msgid)
    }

    /// Removes the entry under `dn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] when `dn` is absent.
    pub fn delete_s(&mut self, dn: &str) -> Result<LdapOutcome> {
        self.log.record(Operation::Delete, json!({ "dn": dn }));

        if let Some(preset) = self.presets.lookup(Operation::Delete, &dn) {
            return preset?.into_outcome(Operation::Delete);
        }
        self.store.delete(dn)
    }

    /// Applies an ordered list of modifications to the entry under `dn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] when `dn` is absent and
    /// [`Error::NoSuchAttribute`] when a delete names an absent attribute.
    pub fn modify_s(&mut self, dn: &str, mod_list: &[Mod]) -> Result<LdapOutcome> {
        self.log
            .record(Operation::Modify, json!({ "dn": dn, "mod_list": mod_list }));

        if let Some(preset) = self.presets.lookup(Operation::Modify, &(dn, mod_list)) {
            return preset?.into_outcome(Operation::Modify);
        }
        self.store.modify(dn, mod_list)
    }

    /// Moves the entry under a new RDN, below `superior` when given or its
    /// current parent otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] when the source is absent and
    /// [`Error::AlreadyExists`] when the target is present.
    pub fn rename_s(
        &mut self,
        dn: &str,
        newrdn: &str,
        superior: Option<&str>,
    ) -> Result<LdapOutcome> {
        self.log.record(
            Operation::Rename,
            json!({ "dn": dn, "newrdn": newrdn, "superior": superior }),
        );

        if let Some(preset) = self.presets.lookup(Operation::Rename, &(dn, newrdn, superior)) {
            return preset?.into_outcome(Operation::Rename);
        }
        self.store.rename(dn, newrdn, superior)
    }

    /// Tears down the connection. The mock only records the call.
    pub fn unbind_s(&mut self) {
        self.log.record(Operation::Unbind, json!({}));
    }

    /// Stores a client option. The mock only records and retains it.
    pub fn set_option(&mut self, option: &str, invalue: impl Into<serde_json::Value>) {
        let invalue = invalue.into();
        self.log.record(
            Operation::SetOption,
            json!({ "option": option, "invalue": invalue }),
        );
        self.options.insert(option.to_string(), invalue);
    }

    /// Enables the TLS flag, as `start_tls_s` would on a real connection.
    pub fn start_tls_s(&mut self) {
        self.log.record(Operation::StartTls, json!({}));
        self.tls_enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PresetValue;

    fn seeded() -> MockLdap {
        let mut tree = DirectoryTree::new();
        tree.insert(
            "cn=admin,dc=example,dc=com".to_string(),
            Attributes::from_iter([("userPassword", vec!["secret"])]),
        );
        MockLdap::with_directory(tree)
    }

    #[test]
    fn preset_bypasses_directory() {
        let mut mock = seeded();
        mock.set_return_value(
            Operation::SimpleBind,
            &("cn=admin,dc=example,dc=com", "wrong"),
            Ok(PresetValue::Outcome(LdapOutcome::bind())),
        )
        .unwrap();

        // the preset overrides what the directory would compute
        let outcome = mock
            .simple_bind_s("cn=admin,dc=example,dc=com", "wrong")
            .unwrap();
        assert_eq!(outcome, LdapOutcome::bind());

        // non-matching arguments still fall through
        assert!(matches!(
            mock.simple_bind_s("cn=admin,dc=example,dc=com", "also-wrong"),
            Err(Error::InvalidCredentials(_))
        ));
    }

    #[test]
    fn preset_error_is_raised() {
        let mut mock = seeded();
        mock.set_return_value(
            Operation::Delete,
            &"cn=admin,dc=example,dc=com",
            Err(Error::NoSuchObject("cn=admin,dc=example,dc=com".to_string())),
        )
        .unwrap();

        assert!(matches!(
            mock.delete_s("cn=admin,dc=example,dc=com"),
            Err(Error::NoSuchObject(_))
        ));
        // the directory was never touched
        assert!(mock.entry("cn=admin,dc=example,dc=com").is_some());
    }

    #[test]
    fn preset_shape_mismatch_surfaces() {
        let mut mock = seeded();
        mock.set_return_value(
            Operation::Compare,
            &("cn=admin,dc=example,dc=com", "userPassword", "secret"),
            Ok(PresetValue::Outcome(LdapOutcome::bind())),
        )
        .unwrap();

        let err = mock
            .compare_s("cn=admin,dc=example,dc=com", "userPassword", "secret")
            .unwrap_err();
        assert!(matches!(err, Error::PresetMismatch { .. }));
    }

    #[test]
    fn unsupported_filter_requires_preset() {
        let mut mock = seeded();
        let err = mock
            .search_s(
                "dc=example,dc=com",
                SearchScope::Subtree,
                "(uidNumber>=1000)",
                None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::PresetRequired { .. }));

        // a registered preset satisfies the same search
        mock.set_return_value(
            Operation::Search,
            &(
                "dc=example,dc=com",
                SearchScope::Subtree,
                "(uidNumber>=1000)",
                None::<&[&str]>,
            ),
            Ok(PresetValue::Entries(vec![SearchEntry::new(
                "uid=alice,dc=example,dc=com",
                Attributes::from_iter([("uidNumber", vec!["1000"])]),
            )])),
        )
        .unwrap();

        let entries = mock
            .search_s(
                "dc=example,dc=com",
                SearchScope::Subtree,
                "(uidNumber>=1000)",
                None,
            )
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].first("uidNumber"), Some("1000"));
    }

    #[test]
    fn malformed_filter_is_an_error_even_with_fallthrough() {
        let mut mock = seeded();
        let err = mock
            .search_s("dc=example,dc=com", SearchScope::Subtree, "(((", None)
            .unwrap_err();
        assert!(matches!(err, Error::BadSearchFilter(_)));
    }

    #[test]
    fn add_msgid_counts_calls() {
        let mut mock = MockLdap::new();
        let outcome = mock
            .add_s("uid=a,dc=example", &[("uid", &["a"])])
            .unwrap();
        assert_eq!(outcome.msgid, Some(1));

        let outcome = mock
            .add_s("uid=b,dc=example", &[("uid", &["b"])])
            .unwrap();
        assert_eq!(outcome.msgid, Some(2));
    }

    #[test]
    fn calls_are_recorded_with_actual_arguments() {
        let mut mock = seeded();
        let _ = mock.simple_bind_s("cn=admin,dc=example,dc=com", "secret");
        let _ = mock.compare_s("cn=admin,dc=example,dc=com", "userPassword", "secret");
        mock.unbind_s();

        let calls = mock.calls_made_with_arguments();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].operation, Operation::SimpleBind);
        assert_eq!(calls[0].arguments["who"], "cn=admin,dc=example,dc=com");
        assert_eq!(calls[0].arguments["cred"], "secret");
        assert_eq!(calls[1].arguments["attr"], "userPassword");
        assert_eq!(
            mock.operations_called(),
            vec!["simple_bind_s", "compare_s", "unbind_s"]
        );
    }

    #[test]
    fn preset_hits_are_recorded_too() {
        let mut mock = seeded();
        mock.set_return_value(
            Operation::Compare,
            &("cn=admin,dc=example,dc=com", "userPassword", "x"),
            Ok(PresetValue::Verdict(true)),
        )
        .unwrap();
        let _ = mock.compare_s("cn=admin,dc=example,dc=com", "userPassword", "x");

        assert_eq!(mock.operations_called(), vec!["compare_s"]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut mock = seeded();
        mock.set_return_value(
            Operation::Compare,
            &("cn=x", "a", "v"),
            Ok(PresetValue::Verdict(true)),
        )
        .unwrap();
        let _ = mock.delete_s("cn=admin,dc=example,dc=com");
        mock.set_option("protocol_version", 3);
        mock.start_tls_s();

        mock.reset();

        assert!(mock.calls_made_with_arguments().is_empty());
        assert!(mock.entry("cn=admin,dc=example,dc=com").is_some());
        assert!(mock.option("protocol_version").is_none());
        assert!(!mock.tls_enabled());
        // the preset is gone, so this computes against the store again
        assert_eq!(mock.compare_s("cn=x", "a", "v").unwrap_err(),
            Error::NoSuchObject("cn=x".to_string()));
    }

    #[test]
    fn options_and_tls_flag_are_retained() {
        let mut mock = MockLdap::new();
        mock.set_option("protocol_version", 3);
        assert_eq!(mock.option("protocol_version"), Some(&serde_json::json!(3)));

        assert!(!mock.tls_enabled());
        mock.start_tls_s();
        assert!(mock.tls_enabled());
    }
}
