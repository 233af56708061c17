//! Rules documents for the customs monitoring agent.
//!
//! This crate provides:
//! - `RuleDocument`: strict YAML loader with key normalization and a closed
//!   top-level schema (`checks`, `metadata`, `service_regex`, `tags`)
//! - Interactive `create`/`edit` round trips through an external editor
//! - Deterministic YAML snapshots and SHA-256 content hashes for change detection
//! - A directory-backed store of named documents

pub mod document;
pub mod editor;
pub mod error;
pub mod normalize;
pub mod store;
pub mod template;

pub use document::{RuleDocument, DEFAULT_SERVICE, IDENTITY_FIELD};
pub use editor::EditorConfig;
pub use error::{ErrorKind, Result, RuleError};
pub use normalize::{CanonicalKeys, KeyNormalizer};
pub use store::{LoadResult, LoadStatus, RuleStore};
