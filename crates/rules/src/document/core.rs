//! Core [`RuleDocument`] struct: construction, validation and the editor flows.

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::editor::EditorConfig;
use crate::error::{Result, RuleError};
use crate::normalize::{CanonicalKeys, KeyNormalizer};
use crate::template::render_template;

/// Service label used by [`RuleDocument::create_default`].
pub const DEFAULT_SERVICE: &str = "default";

/// Metadata key every loaded document carries.
pub const IDENTITY_FIELD: &str = "id";

/// One named rule set: checks to run, metadata expectations, tags and the
/// pattern matching it to a running service.
///
/// Attributes change only through a full reload ([`edit`](Self::edit),
/// [`reload`](Self::reload)); there is no per-field setter.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDocument {
    name: String,
    checks: Mapping,
    metadata: Mapping,
    service_regex: Option<String>,
    tags: Vec<String>,
}

/// Attribute set being assembled by a load; applied only once complete.
#[derive(Default)]
struct Attributes {
    checks: Mapping,
    metadata: Mapping,
    service_regex: Option<String>,
    tags: Vec<String>,
}

impl RuleDocument {
    /// Parse `rules_data` into a document named `name`.
    pub fn new(name: impl Into<String>, rules_data: &str) -> Result<Self> {
        Self::new_with(name, rules_data, &CanonicalKeys::default())
    }

    /// Like [`new`](Self::new) with a caller-supplied key normalizer.
    pub fn new_with(
        name: impl Into<String>,
        rules_data: &str,
        normalizer: &dyn KeyNormalizer,
    ) -> Result<Self> {
        let mut doc = Self {
            name: name.into(),
            checks: Mapping::new(),
            metadata: Mapping::new(),
            service_regex: None,
            tags: Vec::new(),
        };
        doc.load(rules_data, normalizer)?;
        Ok(doc)
    }

    /// Build from an untyped YAML value, which must be a string holding the
    /// document text. Any other value is rejected without parsing.
    pub fn from_value(name: impl Into<String>, raw: &Value) -> Result<Self> {
        match raw {
            Value::String(text) => Self::new(name, text),
            other => Err(RuleError::InvalidArgument(format!(
                "rules data must be a str, got {}",
                value_type(other)
            ))),
        }
    }

    /// Build from raw bytes, which must be UTF-8 text.
    pub fn from_bytes(name: impl Into<String>, raw: &[u8]) -> Result<Self> {
        Self::new(name, utf8(raw)?)
    }

    /// Open the default template in the configured editor and load the result
    /// as a document named `service`.
    ///
    /// Single shot: if the edited text does not validate, the error is returned
    /// and the draft is discarded.
    pub fn create(service: &str, editor: &EditorConfig) -> Result<Self> {
        let command = editor.resolve()?;
        let edited = command.edit_buffer(&render_template()?)?;
        let doc = Self::from_bytes(service, &edited)?;
        info!(name = %doc.name, tags = doc.tags.len(), "created rules document");
        Ok(doc)
    }

    /// [`create`](Self::create) for the `"default"` service.
    pub fn create_default(editor: &EditorConfig) -> Result<Self> {
        Self::create(DEFAULT_SERVICE, editor)
    }

    /// Open the current document in the configured editor and reload it from
    /// the edited text, replacing every attribute.
    ///
    /// Fails with [`RuleError::NoEditor`] before touching the filesystem when
    /// no editor is configured. On any error `self` is left unchanged.
    pub fn edit(&mut self, editor: &EditorConfig) -> Result<()> {
        let command = editor.resolve()?;
        let before = self.content_hash()?;
        let edited = command.edit_buffer(&self.to_yaml()?)?;
        self.reload(utf8(&edited)?)?;
        let changed = self.content_hash()? != before;
        info!(name = %self.name, changed, "edited rules document");
        Ok(())
    }

    /// Re-run the loader against new text, replacing every attribute.
    pub fn reload(&mut self, rules_data: &str) -> Result<()> {
        self.load(rules_data, &CanonicalKeys::default())
    }

    /// Like [`reload`](Self::reload) with a caller-supplied key normalizer.
    pub fn reload_with(&mut self, rules_data: &str, normalizer: &dyn KeyNormalizer) -> Result<()> {
        self.load(rules_data, normalizer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checks(&self) -> &Mapping {
        &self.checks
    }

    pub fn metadata(&self) -> &Mapping {
        &self.metadata
    }

    pub fn service_regex(&self) -> Option<&str> {
        self.service_regex.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Parse, normalize and validate `rules_data`, then assign all attributes.
    ///
    /// All-or-nothing: nothing on `self` changes unless every key validates.
    fn load(&mut self, rules_data: &str, normalizer: &dyn KeyNormalizer) -> Result<()> {
        if is_blank(rules_data) {
            return Err(RuleError::Empty);
        }

        let mut parsed: Value = serde_yaml::from_str(rules_data).map_err(RuleError::from_parse)?;
        parsed.apply_merge().map_err(RuleError::from_parse)?;
        let data = match parsed {
            Value::Null => return Err(RuleError::Empty),
            Value::Mapping(map) if map.is_empty() => return Err(RuleError::Empty),
            Value::Mapping(map) => map,
            _ => return Err(RuleError::NotAMapping),
        };

        let data = normalizer.normalize(data, false);

        let mut next = Attributes::default();
        for (key, value) in data {
            let field = match key {
                Value::String(field) => field,
                other => return Err(RuleError::UnknownField(render_key(&other))),
            };
            match field.as_str() {
                "checks" => next.checks = mapping_field("checks", value)?,
                "metadata" => next.metadata = mapping_field("metadata", value)?,
                "service_regex" => next.service_regex = regex_field(value)?,
                "tags" => next.tags = tags_field(value)?,
                "name" => snapshot_name(value)?,
                _ => return Err(RuleError::UnknownField(field)),
            }
        }

        if !next.metadata.contains_key(IDENTITY_FIELD) {
            next.metadata.insert(IDENTITY_FIELD.into(), Value::Bool(true));
        }

        debug!(
            name = %self.name,
            checks = next.checks.len(),
            metadata = next.metadata.len(),
            tags = next.tags.len(),
            "loaded rules document"
        );

        self.checks = next.checks;
        self.metadata = next.metadata;
        self.service_regex = next.service_regex;
        self.tags = next.tags;
        Ok(())
    }
}

impl serde::Serialize for RuleDocument {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.to_mapping(), serializer)
    }
}

// ── Field conversion ────────────────────────────────────────────────

fn mapping_field(field: &'static str, value: Value) -> Result<Mapping> {
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(RuleError::InvalidFieldType {
            field,
            expected: "a mapping",
        }),
    }
}

/// Snapshots written by `to_yaml` carry `name`. The document keeps the name it
/// was constructed with, so the key is validated and otherwise ignored.
fn snapshot_name(value: Value) -> Result<()> {
    match value {
        Value::String(_) | Value::Null => Ok(()),
        _ => Err(RuleError::InvalidFieldType {
            field: "name",
            expected: "a string",
        }),
    }
}

fn regex_field(value: Value) -> Result<Option<String>> {
    match value {
        Value::String(pattern) => Ok(Some(pattern)),
        Value::Null => Ok(None),
        _ => Err(RuleError::InvalidFieldType {
            field: "service_regex",
            expected: "a string",
        }),
    }
}

fn tags_field(value: Value) -> Result<Vec<String>> {
    let invalid = || RuleError::InvalidFieldType {
        field: "tags",
        expected: "a sequence of strings",
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(tag) => Ok(tag),
                _ => Err(invalid()),
            })
            .collect(),
        _ => Err(invalid()),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn utf8(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw)
        .map_err(|e| RuleError::InvalidArgument(format!("rules data must be UTF-8 text: {e}")))
}

/// True when the text holds nothing but whitespace and comments.
fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

fn render_key(key: &Value) -> String {
    serde_yaml::to_string(key)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{key:?}"))
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
