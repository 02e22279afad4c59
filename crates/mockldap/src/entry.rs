//! Directory entry attribute maps and search results.
//!
//! Attribute values are always held as an ordered `Vec<String>`, even when a
//! single value is present. Normalizing at the boundary keeps every entry a
//! proper attribute mapping through any sequence of modifications.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map of a single directory entry.
///
/// Attribute names match case-insensitively on lookup; the name used at
/// insertion time is preserved. Values keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Vec<String>>);

impl Attributes {
    /// Creates an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the entry carries no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the values of the attribute, matching the name
    /// case-insensitively.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&[String]> {
        self.key_of(attribute)
            .and_then(|key| self.0.get(key))
            .map(Vec::as_slice)
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns true if the attribute exists with at least one value.
    #[must_use]
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.get(attribute).is_some_and(|values| !values.is_empty())
    }

    /// Returns true if the attribute contains the given value.
    #[must_use]
    pub fn contains_value(&self, attribute: &str, value: &str) -> bool {
        self.get(attribute)
            .is_some_and(|values| values.iter().any(|candidate| candidate == value))
    }

    /// Appends values to the attribute, creating it when absent.
    pub fn append(&mut self, attribute: &str, values: impl IntoIterator<Item = String>) {
        match self.key_of(attribute).cloned() {
            Some(key) => {
                if let Some(existing) = self.0.get_mut(&key) {
                    existing.extend(values);
                }
            }
            None => {
                self.0.insert(attribute.to_string(), values.into_iter().collect());
            }
        }
    }

    /// Replaces the attribute's values entirely. An empty replacement removes
    /// the attribute; the entry itself always remains a mapping.
    pub fn replace(&mut self, attribute: &str, values: Vec<String>) {
        let key = self
            .key_of(attribute)
            .cloned()
            .unwrap_or_else(|| attribute.to_string());
        if values.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, values);
        }
    }

    /// Removes the whole attribute. Returns true when it was present.
    pub fn remove(&mut self, attribute: &str) -> bool {
        match self.key_of(attribute).cloned() {
            Some(key) => self.0.remove(&key).is_some(),
            None => false,
        }
    }

    /// Removes the named values from the attribute, dropping the attribute
    /// entirely when its last value goes. Returns false when the attribute
    /// was absent.
    pub fn remove_values(&mut self, attribute: &str, values: &[String]) -> bool {
        let Some(key) = self.key_of(attribute).cloned() else {
            return false;
        };
        if let Some(existing) = self.0.get_mut(&key) {
            existing.retain(|candidate| !values.contains(candidate));
            if existing.is_empty() {
                self.0.remove(&key);
            }
        }
        true
    }

    /// Iterates over `(attribute, values)` pairs in attribute order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.0
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Returns a copy restricted to the requested attributes
    /// (case-insensitive). Unknown names are ignored.
    #[must_use]
    pub fn project(&self, attributes: &[&str]) -> Self {
        let map = self
            .0
            .iter()
            .filter(|(name, _)| {
                attributes
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(name))
            })
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        Self(map)
    }

    fn key_of(&self, attribute: &str) -> Option<&String> {
        if let Some((key, _)) = self.0.get_key_value(attribute) {
            return Some(key);
        }
        self.0.keys().find(|key| key.eq_ignore_ascii_case(attribute))
    }
}

impl<K, V, I> FromIterator<(K, I)> for Attributes
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = V>,
{
    fn from_iter<T: IntoIterator<Item = (K, I)>>(iter: T) -> Self {
        let mut attrs = Self::new();
        for (name, values) in iter {
            let name = name.into();
            attrs.append(&name, values.into_iter().map(Into::into));
        }
        attrs
    }
}

impl From<BTreeMap<String, Vec<String>>> for Attributes {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

/// One `(dn, attributes)` pair returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map, restricted to the requested attributes if the search
    /// named any.
    pub attributes: Attributes,
}

impl SearchEntry {
    /// Creates a search entry.
    #[must_use]
    pub fn new(dn: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes.first(attribute)
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes.get(attribute)
    }
}
