//! Key normalization: fold arbitrary key spellings onto canonical attribute names.
//!
//! Hand-edited documents arrive as `serviceRegex`, `Service-Regex`, `TAGS`
//! and so on. [`CanonicalKeys`] folds each key into lower snake form and, when
//! the folded form names a known attribute, replaces the key with it. Keys with
//! no match pass through untouched so the loader can reject them by name.

use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Canonical top-level attribute names of a rules document.
pub const CANONICAL_KEYS: &[&str] = &["checks", "metadata", "service_regex", "tags"];

/// Keys the document loader recognizes: the canonical attributes plus the
/// read-only `name` carried by serialized snapshots.
pub const DOCUMENT_KEYS: &[&str] = &["checks", "metadata", "name", "service_regex", "tags"];

/// Reshapes the keys of a parsed mapping before the loader inspects them.
pub trait KeyNormalizer: Send + Sync {
    /// Normalize `mapping`. With `snake_case` set, nested mapping keys are
    /// folded to snake case as well; otherwise only top-level keys change.
    fn normalize(&self, mapping: Mapping, snake_case: bool) -> Mapping;
}

/// Default normalizer matching folded keys against a fixed set of names.
#[derive(Debug, Clone)]
pub struct CanonicalKeys {
    canonical: &'static [&'static str],
}

impl CanonicalKeys {
    pub fn new(canonical: &'static [&'static str]) -> Self {
        Self { canonical }
    }

    fn canonicalize(&self, key: Value) -> Value {
        let raw = match key {
            Value::String(raw) => raw,
            other => return other,
        };
        let folded = fold_key(&raw);
        match self.canonical.iter().find(|c| **c == folded) {
            Some(canonical) => {
                if *canonical != raw {
                    debug!(from = %raw, to = %canonical, "normalized rules key");
                }
                Value::String((*canonical).to_string())
            }
            None => Value::String(raw),
        }
    }
}

impl Default for CanonicalKeys {
    fn default() -> Self {
        Self::new(DOCUMENT_KEYS)
    }
}

impl KeyNormalizer for CanonicalKeys {
    fn normalize(&self, mapping: Mapping, snake_case: bool) -> Mapping {
        mapping
            .into_iter()
            .map(|(key, value)| {
                let value = if snake_case { fold_nested(value) } else { value };
                (self.canonicalize(key), value)
            })
            .collect()
    }
}

fn fold_nested(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(fold_key(&s)),
                        other => other,
                    };
                    (k, fold_nested(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(fold_nested).collect()),
        other => other,
    }
}

/// Fold a key into lower snake case: `serviceRegex`, `Service-Regex` and
/// `service regex` all become `service_regex`.
pub(crate) fn fold_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev: Option<char> = None;

    for ch in key.trim().chars() {
        if matches!(ch, '-' | '_' | ' ' | '.') {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        } else if ch.is_uppercase() {
            // Word boundary on a lower-to-upper transition only, so acronyms stay whole.
            let boundary = prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
        prev = Some(ch);
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}
