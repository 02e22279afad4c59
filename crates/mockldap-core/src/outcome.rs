//! Success outcome tuples for write operations.
//!
//! The real client returns bare tuples like `(97, [])` for a bind or
//! `(105, [], msgid, [])` for an add. [`LdapOutcome`] is the structured
//! equivalent; the optional fields mirror the tuple positions that only some
//! operations carry.

use serde::{Deserialize, Serialize};

use crate::codes;

/// Result of a successfully completed non-search operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdapOutcome {
    /// Operation completion code (`RES_BIND`, `RES_ADD`, ...).
    pub result_code: u16,
    /// Response controls. The mock never produces any, but presets may carry
    /// arbitrary control payloads.
    #[serde(default)]
    pub controls: Vec<serde_json::Value>,
    /// Message id echoed by operations that report one (add).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgid: Option<u64>,
    /// Referral URLs echoed by operations that report them (add).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrals: Option<Vec<String>>,
}

impl LdapOutcome {
    /// Creates an outcome with the given completion code and no extras.
    #[must_use]
    pub const fn new(result_code: u16) -> Self {
        Self {
            result_code,
            controls: Vec::new(),
            msgid: None,
            referrals: None,
        }
    }

    /// Successful bind, the `(97, [])` tuple.
    #[must_use]
    pub const fn bind() -> Self {
        Self::new(codes::RES_BIND)
    }

    /// Successful modify, the `(103, [])` tuple.
    #[must_use]
    pub const fn modify() -> Self {
        Self::new(codes::RES_MODIFY)
    }

    /// Successful add, the `(105, [], msgid, [])` tuple.
    #[must_use]
    pub fn add(msgid: u64) -> Self {
        Self {
            result_code: codes::RES_ADD,
            controls: Vec::new(),
            msgid: Some(msgid),
            referrals: Some(Vec::new()),
        }
    }

    /// Successful delete, the `(107, [])` tuple.
    #[must_use]
    pub const fn delete() -> Self {
        Self::new(codes::RES_DELETE)
    }

    /// Successful rename, the `(109, [])` tuple.
    #[must_use]
    pub const fn rename() -> Self {
        Self::new(codes::RES_MODRDN)
    }
}
