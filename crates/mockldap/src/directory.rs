//! The in-memory directory tree and the computed operation fallbacks.
//!
//! [`DirectoryStore`] holds the tree the mock answers from when no preset
//! return value matches a call. Entries are keyed by the DN string the caller
//! supplied; lookups fall back to an ASCII-case-insensitive comparison, since
//! real servers treat DNs case-insensitively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::dn::{DistinguishedName, RelativeDistinguishedName};
use crate::entry::{Attributes, SearchEntry};
use crate::filter::Filter;
use crate::Result;
use mockldap_core::{Error, LdapOutcome};

/// The seedable directory contents: DN string to attribute map.
pub type DirectoryTree = BTreeMap<String, Attributes>;

/// Search breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchScope {
    /// The base DN only.
    Base,
    /// Immediate children of the base DN.
    OneLevel,
    /// The base DN and all of its descendants.
    Subtree,
}

/// One step of a modify operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mod {
    /// Append values to an attribute, creating it when absent.
    Add {
        /// Attribute to modify.
        attribute: String,
        /// Values to append.
        values: Vec<String>,
    },
    /// Delete values from an attribute, or the whole attribute when no
    /// values are given.
    Delete {
        /// Attribute to modify.
        attribute: String,
        /// Values to delete (empty removes the attribute).
        values: Vec<String>,
    },
    /// Replace an attribute's values entirely.
    Replace {
        /// Attribute to modify.
        attribute: String,
        /// Replacement values.
        values: Vec<String>,
    },
}

impl Mod {
    /// Append values to `attribute`.
    pub fn add(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::Add {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Delete specific values from `attribute`.
    pub fn delete(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::Delete {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Delete `attribute` wholesale.
    pub fn delete_attribute(attribute: impl Into<String>) -> Self {
        Self::Delete {
            attribute: attribute.into(),
            values: Vec::new(),
        }
    }

    /// Replace the values of `attribute`.
    pub fn replace(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::Replace {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// In-memory directory tree with the computed operation logic.
#[derive(Debug, Clone, Default)]
pub struct DirectoryStore {
    entries: DirectoryTree,
    seed: DirectoryTree,
}

impl DirectoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given tree. The seed is retained so
    /// [`DirectoryStore::reset`] can restore it.
    #[must_use]
    pub fn with_tree(tree: DirectoryTree) -> Self {
        Self {
            entries: tree.clone(),
            seed: tree,
        }
    }

    /// Restores the tree to its originally seeded contents.
    pub fn reset(&mut self) {
        self.entries = self.seed.clone();
    }

    /// Borrows the current tree.
    #[must_use]
    pub fn tree(&self) -> &DirectoryTree {
        &self.entries
    }

    /// Returns the entry stored under `dn`, matching case-insensitively.
    #[must_use]
    pub fn entry(&self, dn: &str) -> Option<&Attributes> {
        self.resolve(dn).and_then(|key| self.entries.get(&key))
    }

    /// Verifies bind credentials against the entry's `userPassword`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] on mismatch or when the entry
    /// does not exist. An empty DN with an empty credential is an anonymous
    /// bind and succeeds.
    pub fn bind(&self, who: &str, cred: &str) -> Result<LdapOutcome> {
        if who.is_empty() && cred.is_empty() {
            return Ok(LdapOutcome::bind());
        }

        let matched = self
            .entry(who)
            .map(|attrs| attrs.contains_value("userPassword", cred));
        if matched == Some(true) {
            Ok(LdapOutcome::bind())
        } else {
            Err(Error::InvalidCredentials(who.to_string()))
        }
    }

    /// True if `attr` on entry `dn` contains `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] when `dn` is absent.
    pub fn compare(&self, dn: &str, attr: &str, value: &str) -> Result<bool> {
        let attrs = self
            .entry(dn)
            .ok_or_else(|| Error::NoSuchObject(dn.to_string()))?;
        Ok(attrs.contains_value(attr, value))
    }

    /// Inserts a new entry built from the attribute-value record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] when `dn` is present and
    /// [`Error::InvalidDnSyntax`] when it cannot be parsed.
    pub fn add(&mut self, dn: &str, record: &[(&str, &[&str])], msgid: u64) -> Result<LdapOutcome> {
        DistinguishedName::parse(dn).map_err(Error::from)?;
        if self.entry(dn).is_some() {
            return Err(Error::AlreadyExists(dn.to_string()));
        }

        let mut attrs = Attributes::new();
        for (attribute, values) in record {
            attrs.append(attribute, values.iter().map(ToString::to_string));
        }
        self.entries.insert(dn.to_string(), attrs);
        Ok(LdapOutcome::add(msgid))
    }

    /// Removes the entry under `dn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] when `dn` is absent.
    pub fn delete(&mut self, dn: &str) -> Result<LdapOutcome> {
        let key = self
            .resolve(dn)
            .ok_or_else(|| Error::NoSuchObject(dn.to_string()))?;
        self.entries.remove(&key);
        Ok(LdapOutcome::delete())
    }

    /// Applies an ordered list of modifications to the entry under `dn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] when `dn` is absent, and
    /// [`Error::NoSuchAttribute`] when a delete names an attribute the entry
    /// does not carry.
    pub fn modify(&mut self, dn: &str, mods: &[Mod]) -> Result<LdapOutcome> {
        let key = self
            .resolve(dn)
            .ok_or_else(|| Error::NoSuchObject(dn.to_string()))?;
        // the key came out of the map a moment ago
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| Error::NoSuchObject(dn.to_string()))?;

        for modification in mods {
            match modification {
                Mod::Add { attribute, values } => {
                    entry.append(attribute, values.iter().cloned());
                }
                Mod::Delete { attribute, values } => {
                    let removed = if values.is_empty() {
                        entry.remove(attribute)
                    } else {
                        entry.remove_values(attribute, values)
                    };
                    if !removed {
                        return Err(Error::NoSuchAttribute(attribute.clone()));
                    }
                }
                Mod::Replace { attribute, values } => {
                    entry.replace(attribute, values.clone());
                }
            }
        }

        Ok(LdapOutcome::modify())
    }

    /// Re-keys the entry under a new RDN, below `superior` when given or the
    /// old DN's parent otherwise, and rewrites the RDN attribute inside the
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] when the source is absent,
    /// [`Error::AlreadyExists`] when the target is present, and
    /// [`Error::InvalidDnSyntax`] for malformed names.
    pub fn rename(&mut self, dn: &str, newrdn: &str, superior: Option<&str>) -> Result<LdapOutcome> {
        let old_dn = DistinguishedName::parse(dn).map_err(Error::from)?;
        let rdn = RelativeDistinguishedName::parse(newrdn).map_err(Error::from)?;

        let key = self
            .resolve(dn)
            .ok_or_else(|| Error::NoSuchObject(dn.to_string()))?;

        let parent = match superior {
            Some(superior) => Some(DistinguishedName::parse(superior).map_err(Error::from)?),
            None => old_dn.parent(),
        };
        let new_dn = match parent {
            Some(parent) => parent.with_prefix(rdn.clone()),
            None => DistinguishedName::parse(newrdn).map_err(Error::from)?,
        };

        if self.entry(new_dn.as_str()).is_some() {
            return Err(Error::AlreadyExists(new_dn.as_str().to_string()));
        }

        let mut entry = self
            .entries
            .remove(&key)
            .ok_or_else(|| Error::NoSuchObject(dn.to_string()))?;
        entry.replace(rdn.attribute(), vec![rdn.value().to_string()]);
        self.entries.insert(new_dn.as_str().to_string(), entry);

        Ok(LdapOutcome::rename())
    }

    /// Evaluates a search against the tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] for a base-scope search of an absent
    /// DN, [`Error::BadSearchFilter`] for a malformed filter, and
    /// [`Error::InvalidDnSyntax`] for a malformed base.
    pub fn search(
        &self,
        base: &str,
        scope: SearchScope,
        filterstr: &str,
        attrlist: Option<&[&str]>,
    ) -> Result<Vec<SearchEntry>> {
        let filter = Filter::parse(filterstr).map_err(Error::from)?;
        let base_dn = DistinguishedName::parse(base).map_err(Error::from)?;

        if scope == SearchScope::Base {
            let key = self
                .resolve(base)
                .ok_or_else(|| Error::NoSuchObject(base.to_string()))?;
            let attrs = &self.entries[&key];
            if filter.matches(attrs) {
                return Ok(vec![project(&key, attrs, attrlist)]);
            }
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for (dn, attrs) in &self.entries {
            let Ok(candidate) = DistinguishedName::parse(dn) else {
                continue;
            };
            let in_scope = match scope {
                SearchScope::Base => unreachable!("handled above"),
                SearchScope::OneLevel => candidate.is_child_of(&base_dn),
                SearchScope::Subtree => {
                    candidate.equivalent(&base_dn) || candidate.is_descendant_of(&base_dn)
                }
            };
            if in_scope && filter.matches(attrs) {
                results.push(project(dn, attrs, attrlist));
            }
        }
        debug!(base, ?scope, filter = filterstr, hits = results.len(), "computed search");
        Ok(results)
    }

    fn resolve(&self, dn: &str) -> Option<String> {
        if self.entries.contains_key(dn) {
            return Some(dn.to_string());
        }
        self.entries
            .keys()
            .find(|key| key.eq_ignore_ascii_case(dn))
            .cloned()
    }
}

fn project(dn: &str, attrs: &Attributes, attrlist: Option<&[&str]>) -> SearchEntry {
    let attributes = match attrlist {
        Some(wanted) => attrs.project(wanted),
        None => attrs.clone(),
    };
    SearchEntry::new(dn, attributes)
}
