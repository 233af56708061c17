//! The rules document model.
//!
//! A [`RuleDocument`] is built from YAML text, a `create` session in an
//! external editor, or an `edit` of an existing document. All three paths go
//! through one loader that normalizes keys, rejects anything outside the
//! closed top-level schema and replaces every attribute wholesale.

mod core;
mod serialize;

#[cfg(test)]
mod tests;

pub use self::core::{RuleDocument, DEFAULT_SERVICE, IDENTITY_FIELD};
pub(crate) use self::serialize::sorted_value;
