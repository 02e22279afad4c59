//! Distinguished name parsing and manipulation.
//!
//! The directory keys entries by DN strings supplied by the caller, but scope
//! matching during search and re-keying during rename need structural access
//! to the components. Parsing is intentionally strict to surface malformed
//! DNs early.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use mockldap_core::Error as CoreError;

/// Errors that can occur when parsing or manipulating distinguished names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the attribute name to the left of the `=`.
    #[error("distinguished name component missing attribute: {0}")]
    MissingAttribute(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::InvalidDnSyntax(err.to_string())
    }
}

/// Relative distinguished name (single attribute/value pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeDistinguishedName {
    attribute: String,
    value: String,
}

impl RelativeDistinguishedName {
    /// Create a new relative distinguished name.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Parses a single `attr=value` component.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the component is malformed.
    pub fn parse(input: &str) -> Result<Self, DistinguishedNameError> {
        let (attribute, value) = split_attribute_value(input.trim())?;
        Ok(Self { attribute, value })
    }

    /// Attribute portion of the RDN (e.g. `cn`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Attribute value portion of the RDN.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this RDN matches the provided attribute name
    /// (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }

    /// Returns true if both RDNs carry the same attribute (case-insensitive)
    /// and the same value.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.matches_attribute(&other.attribute) && self.value == other.value
    }
}

impl fmt::Display for RelativeDistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape(&self.value))
    }
}

impl FromStr for RelativeDistinguishedName {
    type Err = DistinguishedNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Strongly-typed distinguished name.
///
/// Keeps a canonical string representation alongside the ordered RDN
/// components, leftmost (most specific) first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<RelativeDistinguishedName>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the distinguished name is empty
    /// or contains invalid syntax.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, DistinguishedNameError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DistinguishedNameError::Empty);
        }

        let mut rdns = Vec::new();
        for component in split_escaped(raw, ',')? {
            if component.is_empty() {
                return Err(DistinguishedNameError::InvalidComponent(raw.to_string()));
            }

            let (attribute, value) = split_attribute_value(&component)?;
            rdns.push(RelativeDistinguishedName::new(attribute, value));
        }

        Ok(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the RDN components in order, most specific first.
    #[must_use]
    pub fn rdns(&self) -> &[RelativeDistinguishedName] {
        &self.rdns
    }

    /// Returns the leading (most specific) RDN.
    #[must_use]
    pub fn rdn(&self) -> &RelativeDistinguishedName {
        // parse() rejects empty DNs, so the vector is never empty
        &self.rdns[0]
    }

    /// Returns the DN with the leading RDN removed, or `None` for a
    /// single-component DN.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.len() < 2 {
            return None;
        }
        let rdns = self.rdns[1..].to_vec();
        Some(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Looks up the value for the first attribute that matches `attribute`
    /// (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.rdns
            .iter()
            .find(|rdn| rdn.matches_attribute(attribute))
            .map(RelativeDistinguishedName::value)
    }

    /// Returns true if both DNs name the same entry: same component count,
    /// attribute types compared case-insensitively, values exactly.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.rdns.len() == other.rdns.len()
            && self
                .rdns
                .iter()
                .zip(other.rdns.iter())
                .all(|(a, b)| a.equivalent(b))
    }

    /// Returns true if `self` is an immediate child of `base`.
    #[must_use]
    pub fn is_child_of(&self, base: &Self) -> bool {
        self.parent().is_some_and(|parent| parent.equivalent(base))
    }

    /// Returns true if `self` sits strictly below `base`, at any depth.
    #[must_use]
    pub fn is_descendant_of(&self, base: &Self) -> bool {
        if self.rdns.len() <= base.rdns.len() {
            return false;
        }
        let offset = self.rdns.len() - base.rdns.len();
        self.rdns[offset..]
            .iter()
            .zip(base.rdns.iter())
            .all(|(a, b)| a.equivalent(b))
    }

    /// Returns a DN with the leading RDN replaced, keeping the suffix. Used
    /// by rename to move an entry under its existing parent.
    #[must_use]
    pub fn with_rdn(&self, rdn: RelativeDistinguishedName) -> Self {
        let mut rdns = self.rdns.clone();
        rdns[0] = rdn;
        Self {
            raw: rdns_to_string(&rdns),
            rdns,
        }
    }

    /// Creates a new distinguished name by prefixing the provided RDN.
    #[must_use]
    pub fn with_prefix(mut self, rdn: RelativeDistinguishedName) -> Self {
        self.rdns.insert(0, rdn);
        self.raw = rdns_to_string(&self.rdns);
        self
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DistinguishedNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

impl TryFrom<&str> for DistinguishedName {
    type Error = DistinguishedNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

fn split_escaped(input: &str, delimiter: char) -> Result<Vec<String>, DistinguishedNameError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push('\\');
            current.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' {
            escape = true;
            continue;
        }

        if ch == delimiter {
            parts.push(current.trim().to_string());
            current.clear();
            continue;
        }

        current.push(ch);
    }

    if escape {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    if parts.iter().any(String::is_empty) {
        return Err(DistinguishedNameError::InvalidComponent(input.to_string()));
    }
    Ok(parts)
}

fn split_attribute_value(component: &str) -> Result<(String, String), DistinguishedNameError> {
    let mut escape = false;
    let mut index = None;

    for (i, ch) in component.char_indices() {
        if escape {
            escape = false;
            continue;
        }

        if ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '=' {
            index = Some(i);
            break;
        }
    }

    let idx =
        index.ok_or_else(|| DistinguishedNameError::InvalidComponent(component.to_string()))?;
    let attribute = component[..idx].trim();
    let value_part = component[idx + 1..].trim_start();

    if attribute.is_empty() {
        return Err(DistinguishedNameError::MissingAttribute(
            component.to_string(),
        ));
    }

    if value_part.is_empty() {
        return Err(DistinguishedNameError::MissingValue(attribute.to_string()));
    }

    Ok((attribute.to_string(), unescape(value_part)?))
}

fn unescape(value: &str) -> Result<String, DistinguishedNameError> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let next = chars
                .next()
                .ok_or(DistinguishedNameError::UnterminatedEscape)?;
            result.push(next);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn escape(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in chars.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx == chars.len() - 1;
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (is_first && (*ch == ' ' || *ch == '#'))
            || (is_last && *ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(*ch);
    }

    escaped
}

fn rdns_to_string(rdns: &[RelativeDistinguishedName]) -> String {
    rdns.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_dn() {
        let dn = DistinguishedName::parse("cn=John Doe,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("John Doe"));
        assert_eq!(dn.get("ou"), Some("People"));
        assert_eq!(dn.rdn().attribute(), "cn");
        assert_eq!(dn.to_string(), "cn=John Doe,ou=People,dc=example,dc=com");
    }

    #[test]
    fn parse_dn_with_escape() {
        let dn = DistinguishedName::parse("cn=Smith\\, John,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("Smith, John"));
        assert!(dn.to_string().starts_with("cn=Smith\\, John,ou=People"));
    }

    #[test]
    fn invalid_trailing_delimiter() {
        let err = DistinguishedName::parse("cn=John,").unwrap_err();
        assert!(matches!(err, DistinguishedNameError::InvalidComponent(_)));
    }

    #[test]
    fn missing_value_rejected() {
        let err = DistinguishedName::parse("cn=,dc=example").unwrap_err();
        assert!(matches!(err, DistinguishedNameError::MissingValue(_)));
    }

    #[test]
    fn parent_walks_up_one_level() {
        let dn = DistinguishedName::parse("uid=alice,ou=People,dc=example,dc=com").unwrap();
        let parent = dn.parent().unwrap();
        assert_eq!(parent.as_str(), "ou=People,dc=example,dc=com");

        let top = DistinguishedName::parse("dc=com").unwrap();
        assert!(top.parent().is_none());
    }

    #[test]
    fn child_and_descendant_checks() {
        let base = DistinguishedName::parse("ou=People,dc=example,dc=com").unwrap();
        let child = DistinguishedName::parse("uid=alice,ou=People,dc=example,dc=com").unwrap();
        let grandchild =
            DistinguishedName::parse("cn=dev,uid=alice,ou=People,dc=example,dc=com").unwrap();

        assert!(child.is_child_of(&base));
        assert!(!grandchild.is_child_of(&base));
        assert!(child.is_descendant_of(&base));
        assert!(grandchild.is_descendant_of(&base));
        assert!(!base.is_descendant_of(&base));
    }

    #[test]
    fn equivalence_ignores_attribute_case() {
        let a = DistinguishedName::parse("CN=admin,DC=example").unwrap();
        let b = DistinguishedName::parse("cn=admin,dc=example").unwrap();
        assert!(a.equivalent(&b));

        let c = DistinguishedName::parse("cn=Admin,dc=example").unwrap();
        assert!(!a.equivalent(&c));
    }

    #[test]
    fn with_rdn_replaces_leading_component() {
        let dn = DistinguishedName::parse("uid=alice,ou=People,dc=example,dc=com").unwrap();
        let renamed = dn.with_rdn(RelativeDistinguishedName::new("uid", "bob"));
        assert_eq!(renamed.as_str(), "uid=bob,ou=People,dc=example,dc=com");
        // original untouched
        assert_eq!(dn.get("uid"), Some("alice"));
    }

    #[test]
    fn with_prefix_builds_child() {
        let base = DistinguishedName::parse("ou=People,dc=example,dc=com").unwrap();
        let user = base.with_prefix(RelativeDistinguishedName::new("cn", "Jane Doe"));
        assert_eq!(user.to_string(), "cn=Jane Doe,ou=People,dc=example,dc=com");
    }

    #[test]
    fn rdn_parse_round_trip() {
        let rdn = RelativeDistinguishedName::parse("uid=bob").unwrap();
        assert_eq!(rdn.attribute(), "uid");
        assert_eq!(rdn.value(), "bob");
        assert_eq!(rdn.to_string(), "uid=bob");
    }
}
