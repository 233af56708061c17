//! Snapshot, YAML rendering and content hashing for [`RuleDocument`].

use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};

use super::RuleDocument;
use crate::error::Result;

impl RuleDocument {
    /// Every attribute, `name` included, keyed by its canonical name.
    ///
    /// Nested mappings are key-sorted so equal documents render identically.
    pub fn to_mapping(&self) -> Mapping {
        let mut map = Mapping::new();
        map.insert(
            "checks".into(),
            sorted_value(Value::Mapping(self.checks().clone())),
        );
        map.insert(
            "metadata".into(),
            sorted_value(Value::Mapping(self.metadata().clone())),
        );
        map.insert("name".into(), self.name().into());
        map.insert(
            "service_regex".into(),
            self.service_regex().map_or(Value::Null, Value::from),
        );
        map.insert(
            "tags".into(),
            Value::Sequence(self.tags().iter().map(|t| Value::from(t.as_str())).collect()),
        );
        map
    }

    /// Block-style YAML of [`to_mapping`](Self::to_mapping). Non-ASCII text is
    /// written as-is.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_mapping())?)
    }

    /// SHA-256 hex digest of [`to_yaml`](Self::to_yaml), for change detection.
    pub fn content_hash(&self) -> Result<String> {
        let yaml = self.to_yaml()?;
        let digest = Sha256::digest(yaml.as_bytes());
        Ok(format!("{digest:x}"))
    }
}

/// Recursively sort mapping keys so rendering does not depend on insertion order.
pub(crate) fn sorted_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(String, Value, Value)> = map
                .into_iter()
                .map(|(k, v)| (sort_key(&k), k, sorted_value(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Mapping(entries.into_iter().map(|(_, k, v)| (k, v)).collect())
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(sorted_value).collect()),
        Value::Tagged(mut tagged) => {
            let inner = std::mem::replace(&mut tagged.value, Value::Null);
            tagged.value = sorted_value(inner);
            Value::Tagged(tagged)
        }
        other => other,
    }
}

fn sort_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}
