//! Search filter parsing and evaluation.
//!
//! Covers the part of the RFC 4515 grammar the mock can satisfy internally:
//! equality `(attr=value)`, presence `(attr=*)`, substring patterns
//! `(attr=ab*cd*)`, and the `&`, `|`, `!` combinators. Ordering and
//! approximate operators (`>=`, `<=`, `~=`) are rejected; register a preset
//! return value for searches that need them.
//!
//! `(objectClass=*)` is the conventional "match everything" default filter
//! and is treated as such even for entries that carry no `objectClass`.

use std::fmt;
use thiserror::Error;

use crate::entry::Attributes;
use mockldap_core::Error as CoreError;

/// Errors produced while parsing a filter string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The filter string was empty.
    #[error("filter cannot be empty")]
    Empty,
    /// A parenthesis was missing or unbalanced.
    #[error("unbalanced parentheses in filter: {0}")]
    Unbalanced(String),
    /// A simple filter item was missing its `=`.
    #[error("filter item missing comparison: {0}")]
    MissingComparison(String),
    /// The attribute description was empty.
    #[error("filter item missing attribute: {0}")]
    MissingAttribute(String),
    /// The operator is outside the supported grammar.
    #[error("unsupported filter operator `{operator}` in: {item}")]
    UnsupportedOperator {
        /// The rejected operator.
        operator: String,
        /// The filter item it appeared in.
        item: String,
    },
    /// Input remained after the outermost filter closed.
    #[error("trailing input after filter: {0}")]
    TrailingInput(String),
}

impl From<FilterError> for CoreError {
    fn from(err: FilterError) -> Self {
        CoreError::BadSearchFilter(err.to_string())
    }
}

/// Parsed search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All nested filters must match.
    And(Vec<Filter>),
    /// At least one nested filter must match.
    Or(Vec<Filter>),
    /// The nested filter must not match.
    Not(Box<Filter>),
    /// The attribute must be present with at least one value.
    Present {
        /// Attribute description.
        attribute: String,
    },
    /// The attribute must contain exactly this value.
    Equality {
        /// Attribute description.
        attribute: String,
        /// Asserted value.
        value: String,
    },
    /// The attribute must contain a value matching the `*`-pattern.
    Substring {
        /// Attribute description.
        attribute: String,
        /// Required prefix, if any.
        initial: Option<String>,
        /// Required inner fragments, in order.
        any: Vec<String>,
        /// Required suffix, if any.
        final_part: Option<String>,
    },
}

impl Filter {
    /// Parses a filter string.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] when the string is not a well-formed filter or
    /// uses an operator outside the supported grammar.
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FilterError::Empty);
        }

        let mut parser = Parser {
            chars: trimmed.char_indices().peekable(),
            input: trimmed,
        };
        let filter = parser.parse_filter()?;
        if parser.chars.next().is_some() {
            return Err(FilterError::TrailingInput(trimmed.to_string()));
        }
        Ok(filter)
    }

    /// Evaluates the filter against an entry's attributes.
    #[must_use]
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|filter| filter.matches(attributes)),
            Self::Or(filters) => filters.iter().any(|filter| filter.matches(attributes)),
            Self::Not(filter) => !filter.matches(attributes),
            Self::Present { attribute } => {
                // the default filter matches every entry
                attribute.eq_ignore_ascii_case("objectClass") || attributes.has_attribute(attribute)
            }
            Self::Equality { attribute, value } => attributes.contains_value(attribute, value),
            Self::Substring {
                attribute,
                initial,
                any,
                final_part,
            } => attributes.get(attribute).is_some_and(|values| {
                values
                    .iter()
                    .any(|value| substring_match(value, initial.as_deref(), any, final_part.as_deref()))
            }),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(filters) => {
                write!(f, "(&")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                write!(f, ")")
            }
            Self::Or(filters) => {
                write!(f, "(|")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                write!(f, ")")
            }
            Self::Not(filter) => write!(f, "(!{filter})"),
            Self::Present { attribute } => write!(f, "({attribute}=*)"),
            Self::Equality { attribute, value } => write!(f, "({attribute}={value})"),
            Self::Substring {
                attribute,
                initial,
                any,
                final_part,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(initial) = initial {
                    write!(f, "{initial}")?;
                }
                for part in any {
                    write!(f, "*{part}")?;
                }
                write!(f, "*")?;
                if let Some(final_part) = final_part {
                    write!(f, "{final_part}")?;
                }
                write!(f, ")")
            }
        }
    }
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    input: &'a str,
}

impl Parser<'_> {
    fn parse_filter(&mut self) -> Result<Filter, FilterError> {
        self.expect('(')?;
        let filter = match self.chars.peek().map(|&(_, ch)| ch) {
            Some('&') => {
                self.chars.next();
                Filter::And(self.parse_set()?)
            }
            Some('|') => {
                self.chars.next();
                Filter::Or(self.parse_set()?)
            }
            Some('!') => {
                self.chars.next();
                Filter::Not(Box::new(self.parse_filter()?))
            }
            Some(_) => self.parse_item()?,
            None => return Err(FilterError::Unbalanced(self.input.to_string())),
        };
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_set(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut filters = Vec::new();
        while self.chars.peek().map(|&(_, ch)| ch) == Some('(') {
            filters.push(self.parse_filter()?);
        }
        if filters.is_empty() {
            return Err(FilterError::Unbalanced(self.input.to_string()));
        }
        Ok(filters)
    }

    fn parse_item(&mut self) -> Result<Filter, FilterError> {
        let mut item = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch == ')' {
                break;
            }
            if ch == '(' {
                return Err(FilterError::Unbalanced(self.input.to_string()));
            }
            item.push(ch);
            self.chars.next();
        }

        let idx = item
            .find('=')
            .ok_or_else(|| FilterError::MissingComparison(item.clone()))?;
        let mut attribute = item[..idx].to_string();
        let value = item[idx + 1..].to_string();

        // >=, <= and ~= land here with the operator's first char glued to
        // the attribute description
        if let Some(last) = attribute.chars().last() {
            if matches!(last, '>' | '<' | '~') {
                return Err(FilterError::UnsupportedOperator {
                    operator: format!("{last}="),
                    item,
                });
            }
        }

        attribute = attribute.trim().to_string();
        if attribute.is_empty() {
            return Err(FilterError::MissingAttribute(item));
        }

        if value == "*" {
            return Ok(Filter::Present { attribute });
        }

        if value.contains('*') {
            let mut parts = value.split('*');
            let initial = parts.next().filter(|part| !part.is_empty()).map(String::from);
            let mut any: Vec<String> = parts.map(String::from).collect();
            let final_part = any.pop().filter(|part| !part.is_empty());
            any.retain(|part| !part.is_empty());
            return Ok(Filter::Substring {
                attribute,
                initial,
                any,
                final_part,
            });
        }

        Ok(Filter::Equality { attribute, value })
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterError> {
        match self.chars.next() {
            Some((_, ch)) if ch == expected => Ok(()),
            _ => Err(FilterError::Unbalanced(self.input.to_string())),
        }
    }
}

fn substring_match(value: &str, initial: Option<&str>, any: &[String], final_part: Option<&str>) -> bool {
    let mut rest = value;

    if let Some(initial) = initial {
        if !rest.starts_with(initial) {
            return false;
        }
        rest = &rest[initial.len()..];
    }

    for part in any {
        match rest.find(part.as_str()) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    match final_part {
        Some(final_part) => rest.ends_with(final_part),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Attributes {
        Attributes::from_iter([
            ("uid", vec!["alice"]),
            ("mail", vec!["alice@example.com", "a.liddell@example.org"]),
            ("objectClass", vec!["person", "inetOrgPerson"]),
        ])
    }

    #[test]
    fn equality_matches_any_value() {
        let filter = Filter::parse("(mail=a.liddell@example.org)").unwrap();
        assert!(filter.matches(&entry()));

        let filter = Filter::parse("(uid=bob)").unwrap();
        assert!(!filter.matches(&entry()));
    }

    #[test]
    fn equality_attribute_is_case_insensitive() {
        let filter = Filter::parse("(UID=alice)").unwrap();
        assert!(filter.matches(&entry()));
    }

    #[test]
    fn presence_requires_the_attribute() {
        assert!(Filter::parse("(mail=*)").unwrap().matches(&entry()));
        assert!(!Filter::parse("(phone=*)").unwrap().matches(&entry()));
    }

    #[test]
    fn default_filter_matches_entries_without_object_class() {
        let bare = Attributes::from_iter([("ou", vec!["People"])]);
        assert!(Filter::parse("(objectClass=*)").unwrap().matches(&bare));
    }

    #[test]
    fn substring_patterns() {
        let filter = Filter::parse("(mail=alice*)").unwrap();
        assert!(filter.matches(&entry()));

        let filter = Filter::parse("(mail=*example*)").unwrap();
        assert!(filter.matches(&entry()));

        let filter = Filter::parse("(mail=a*example*org)").unwrap();
        assert!(filter.matches(&entry()));

        let filter = Filter::parse("(mail=bob*)").unwrap();
        assert!(!filter.matches(&entry()));
    }

    #[test]
    fn boolean_combinators() {
        let filter = Filter::parse("(&(objectClass=person)(uid=alice))").unwrap();
        assert!(filter.matches(&entry()));

        let filter = Filter::parse("(|(uid=bob)(uid=alice))").unwrap();
        assert!(filter.matches(&entry()));

        let filter = Filter::parse("(!(uid=alice))").unwrap();
        assert!(!filter.matches(&entry()));

        let filter = Filter::parse("(&(objectClass=person)(!(uid=bob)))").unwrap();
        assert!(filter.matches(&entry()));
    }

    #[test]
    fn unsupported_operators_are_rejected() {
        let err = Filter::parse("(uidNumber>=1000)").unwrap_err();
        assert!(matches!(
            err,
            FilterError::UnsupportedOperator { ref operator, .. } if operator == ">="
        ));

        let err = Filter::parse("(cn~=alice)").unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert!(matches!(Filter::parse(""), Err(FilterError::Empty)));
        assert!(matches!(
            Filter::parse("(uid=alice"),
            Err(FilterError::Unbalanced(_))
        ));
        assert!(matches!(
            Filter::parse("uid=alice"),
            Err(FilterError::Unbalanced(_))
        ));
        assert!(matches!(
            Filter::parse("(uid=alice))"),
            Err(FilterError::TrailingInput(_))
        ));
        assert!(matches!(
            Filter::parse("(&)"),
            Err(FilterError::Unbalanced(_))
        ));
        assert!(matches!(
            Filter::parse("(uidalice)"),
            Err(FilterError::MissingComparison(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        for input in [
            "(uid=alice)",
            "(mail=*)",
            "(&(objectClass=person)(uid=alice))",
            "(!(uid=bob))",
        ] {
            let filter = Filter::parse(input).unwrap();
            assert_eq!(filter.to_string(), input);
            assert_eq!(Filter::parse(&filter.to_string()).unwrap(), filter);
        }
    }
}
