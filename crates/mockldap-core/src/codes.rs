//! LDAP result code constants.
//!
//! The values mirror the ones the real client library reports, so assertions
//! written against the mock keep working when the real client is swapped back
//! in. Operation completion codes (`RES_*`) are the message types echoed in
//! success tuples; the remaining constants are protocol result codes carried
//! by error conditions.

/// Bind operation completed (`RES_BIND`).
pub const RES_BIND: u16 = 97;
/// Search operation completed (`RES_SEARCH_RESULT`).
pub const RES_SEARCH_RESULT: u16 = 101;
/// Modify operation completed (`RES_MODIFY`).
pub const RES_MODIFY: u16 = 103;
/// Add operation completed (`RES_ADD`).
pub const RES_ADD: u16 = 105;
/// Delete operation completed (`RES_DELETE`).
pub const RES_DELETE: u16 = 107;
/// Rename (modrdn) operation completed (`RES_MODRDN`).
pub const RES_MODRDN: u16 = 109;

/// `noSuchAttribute` protocol result code.
pub const NO_SUCH_ATTRIBUTE: u16 = 16;
/// `noSuchObject` protocol result code.
pub const NO_SUCH_OBJECT: u16 = 32;
/// `invalidDNSyntax` protocol result code.
pub const INVALID_DN_SYNTAX: u16 = 34;
/// `invalidCredentials` protocol result code.
pub const INVALID_CREDENTIALS: u16 = 49;
/// `entryAlreadyExists` protocol result code.
pub const ENTRY_ALREADY_EXISTS: u16 = 68;
/// Filter could not be parsed (`filterError`).
pub const FILTER_ERROR: u16 = 87;
