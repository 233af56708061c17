//! Tests for the rules document model.

use serde_yaml::{Mapping, Value};

use super::*;
use crate::editor::EditorConfig;
use crate::error::{ErrorKind, RuleError};
use crate::normalize::KeyNormalizer;

const WEB_RULES_YAML: &str = r#"
checks:
  check: /usr/local/bin/check_web.sh
  interval: 10s
  httpcheck: http://localhost:8080/health
metadata:
  id: true
  image: true
  host_config:
    privileged: true
    binds: true
service_regex: "^web-.*"
tags:
  - docker
  - web
"#;

fn web_rules() -> RuleDocument {
    RuleDocument::new("web", WEB_RULES_YAML).unwrap()
}

/// Editor that overwrites the buffer with `contents`. The returned dir holds
/// the script and must outlive the editor call.
#[cfg(unix)]
fn writing_editor(contents: &str) -> (tempfile::TempDir, EditorConfig) {
    let dir = tempfile::tempdir().unwrap();
    let payload = dir.path().join("payload.yml");
    std::fs::write(&payload, contents).unwrap();
    let script = dir.path().join("editor.sh");
    // The buffer path arrives as $1.
    std::fs::write(&script, format!("cat '{}' > \"$1\"\n", payload.display())).unwrap();
    let editor = EditorConfig::with_command(format!("sh {}", script.display()));
    (dir, editor)
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn load_example_document() {
    let doc = RuleDocument::new("svc", "metadata:\n  id: true\ntags:\n  - docker\n").unwrap();

    let mut expected_metadata = Mapping::new();
    expected_metadata.insert("id".into(), Value::Bool(true));

    assert_eq!(doc.name(), "svc");
    assert_eq!(doc.metadata(), &expected_metadata);
    assert_eq!(doc.tags(), ["docker".to_string()]);
    assert!(doc.checks().is_empty());
    assert_eq!(doc.service_regex(), None);
}

#[test]
fn load_full_document() {
    let doc = web_rules();
    assert_eq!(doc.service_regex(), Some("^web-.*"));
    assert_eq!(doc.tags(), ["docker".to_string(), "web".to_string()]);
    assert_eq!(
        doc.checks().get("interval").and_then(Value::as_str),
        Some("10s")
    );
    let privileged = doc
        .metadata()
        .get("host_config")
        .and_then(|h| h.get("privileged"));
    assert_eq!(privileged, Some(&Value::Bool(true)));
}

#[test]
fn tags_keep_order_and_duplicates() {
    let doc = RuleDocument::new("svc", "tags: [b, a, b]\n").unwrap();
    assert_eq!(doc.tags(), ["b", "a", "b"].map(String::from));
}

#[test]
fn missing_id_is_injected() {
    let doc = RuleDocument::new("svc", "metadata:\n  image: true\n").unwrap();
    assert_eq!(doc.metadata().get(IDENTITY_FIELD), Some(&Value::Bool(true)));
    assert_eq!(doc.metadata().get("image"), Some(&Value::Bool(true)));
}

#[test]
fn missing_metadata_still_gets_id() {
    let doc = RuleDocument::new("svc", "tags: [docker]\n").unwrap();
    assert_eq!(doc.metadata().len(), 1);
    assert_eq!(doc.metadata().get(IDENTITY_FIELD), Some(&Value::Bool(true)));
}

#[test]
fn explicit_id_is_preserved() {
    let doc = RuleDocument::new("svc", "metadata:\n  id: abc123\n").unwrap();
    assert_eq!(
        doc.metadata().get(IDENTITY_FIELD).and_then(Value::as_str),
        Some("abc123")
    );

    let doc = RuleDocument::new("svc", "metadata:\n  id: false\n").unwrap();
    assert_eq!(doc.metadata().get(IDENTITY_FIELD), Some(&Value::Bool(false)));
}

#[test]
fn null_attributes_take_zero_values() {
    let doc = RuleDocument::new("svc", "checks:\nmetadata:\nservice_regex:\ntags:\n").unwrap();
    assert!(doc.checks().is_empty());
    assert!(doc.tags().is_empty());
    assert_eq!(doc.service_regex(), None);
    assert_eq!(doc.metadata().len(), 1);
}

#[test]
fn key_spellings_are_normalized() {
    let doc = RuleDocument::new(
        "svc",
        "Checks: {}\nserviceRegex: '^api$'\nTags: [api]\nMetadata: {image: true}\n",
    )
    .unwrap();
    assert_eq!(doc.service_regex(), Some("^api$"));
    assert_eq!(doc.tags(), ["api".to_string()]);
    assert!(doc.metadata().contains_key("image"));
}

#[test]
fn nested_metadata_keys_are_kept_verbatim() {
    let doc = RuleDocument::new("svc", "metadata:\n  HostConfig:\n    CpuShares: true\n").unwrap();
    assert!(doc.metadata().contains_key("HostConfig"));
}

#[test]
fn unicode_is_preserved() {
    let doc = RuleDocument::new("svc", "tags: [größe, 日本]\n").unwrap();
    let yaml = doc.to_yaml().unwrap();
    assert!(yaml.contains("größe"));
    assert!(yaml.contains("日本"));
}

#[test]
fn custom_normalizer_is_used() {
    struct Upper;
    impl KeyNormalizer for Upper {
        fn normalize(&self, mapping: Mapping, _snake_case: bool) -> Mapping {
            mapping
                .into_iter()
                .map(|(k, v)| match k {
                    Value::String(s) if s == "labels" => (Value::from("tags"), v),
                    other => (other, v),
                })
                .collect()
        }
    }
    let doc = RuleDocument::new_with("svc", "labels: [docker]\n", &Upper).unwrap();
    assert_eq!(doc.tags(), ["docker".to_string()]);
}

// ── Failures ────────────────────────────────────────────────────────

#[test]
fn unknown_top_level_key_is_rejected() {
    let err = RuleDocument::new("svc", "tags: [docker]\nbogus: 1\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownField);
    assert!(matches!(err, RuleError::UnknownField(ref key) if key == "bogus"));
    assert!(err.to_string().contains("bogus"));
}

#[test]
fn unknown_key_keeps_original_spelling() {
    let err = RuleDocument::new("svc", "Check-Interval: 10s\n").unwrap_err();
    assert!(matches!(err, RuleError::UnknownField(ref key) if key == "Check-Interval"));
}

#[test]
fn non_string_top_level_key_is_rejected() {
    let err = RuleDocument::new("svc", "42: answer\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownField);
}

#[test]
fn non_text_input_is_invalid_argument() {
    for raw in [
        Value::from(42),
        Value::Bool(true),
        Value::Null,
        Value::Mapping(Mapping::new()),
        Value::Sequence(vec![]),
    ] {
        let err = RuleDocument::from_value("svc", &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "input {raw:?}");
    }
}

#[test]
fn string_value_input_is_parsed() {
    let raw = Value::from("tags: [docker]\n");
    let doc = RuleDocument::from_value("svc", &raw).unwrap();
    assert_eq!(doc.tags(), ["docker".to_string()]);
}

#[test]
fn non_utf8_bytes_are_invalid_argument() {
    let err = RuleDocument::from_bytes("svc", &[0xff, 0xfe, b't']).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn empty_document_is_rejected() {
    for text in ["\n", "", "   \n\n", "# only a comment\n", "---\n", "{}\n"] {
        let err = RuleDocument::new("svc", text).unwrap_err();
        assert!(matches!(err, RuleError::Empty), "input {text:?}: {err}");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}

#[test]
fn non_mapping_root_is_rejected() {
    let err = RuleDocument::new("svc", "- docker\n- web\n").unwrap_err();
    assert!(matches!(err, RuleError::NotAMapping));
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn syntax_error_carries_location() {
    let err = RuleDocument::new("svc", "tags: [docker\nmetadata: {id: true}\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    match err {
        RuleError::Syntax { line, .. } => assert!(line >= 1),
        other => panic!("expected located syntax error, got {other:?}"),
    }
}

#[test]
fn syntax_error_names_location_once() {
    let err = RuleDocument::new("svc", "tags: [docker\nmetadata: {id: true}\n").unwrap_err();
    let (line, column) = match &err {
        RuleError::Syntax { line, column, .. } => (*line, *column),
        other => panic!("expected located syntax error, got {other:?}"),
    };
    let rendered = err.to_string();
    assert!(rendered.contains(&format!("line: {line} column: {column}")));
    assert!(!rendered.contains(&format!("at line {line} column {column}")), "{rendered}");
}

#[test]
fn wrong_attribute_shapes_are_rejected() {
    let cases = [
        ("tags: docker\n", "tags"),
        ("tags: [1, 2]\n", "tags"),
        ("checks: [a, b]\n", "checks"),
        ("metadata: true\n", "metadata"),
        ("service_regex: [a]\n", "service_regex"),
    ];
    for (text, expected_field) in cases {
        let err = RuleDocument::new("svc", text).unwrap_err();
        assert!(
            matches!(err, RuleError::InvalidFieldType { field, .. } if field == expected_field),
            "input {text:?}: {err}"
        );
    }
}

#[test]
fn snapshot_loads_under_new_name() {
    let original = web_rules();
    let snapshot = original.to_yaml().unwrap();
    assert!(snapshot.contains("name: web"));

    let copy = RuleDocument::new("web-copy", &snapshot).unwrap();
    assert_eq!(copy.name(), "web-copy");
    assert_eq!(copy.checks(), original.checks());
    assert_eq!(copy.metadata(), original.metadata());
    assert_eq!(copy.service_regex(), original.service_regex());
    assert_eq!(copy.tags(), original.tags());
}

#[test]
fn snapshot_name_must_be_a_string() {
    let err = RuleDocument::new("svc", "name: [a, b]\ntags: []\n").unwrap_err();
    assert!(matches!(err, RuleError::InvalidFieldType { field: "name", .. }));
}

#[test]
fn merge_keys_are_resolved() {
    let text = "metadata:\n  base: &base\n    cpu_shares: true\n  host_config:\n    <<: *base\n    memory: true\n";
    let doc = RuleDocument::new("svc", text).unwrap();
    let host_config = doc
        .metadata()
        .get("host_config")
        .and_then(Value::as_mapping)
        .unwrap();
    assert_eq!(host_config.get("cpu_shares"), Some(&Value::Bool(true)));
    assert_eq!(host_config.get("memory"), Some(&Value::Bool(true)));
    assert!(!host_config.contains_key("<<"));
}

#[test]
fn failed_reload_leaves_document_unchanged() {
    let mut doc = web_rules();
    let before = doc.clone();
    // `tags` is valid and comes first; the unknown key must still abort the whole load.
    let err = doc.reload("tags: [changed]\nbogus: 1\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownField);
    assert_eq!(doc, before);
}

// ── Full-replace reload ─────────────────────────────────────────────

#[test]
fn reload_replaces_instead_of_merging() {
    let mut doc = web_rules();
    doc.reload("metadata:\n  image: true\n").unwrap();

    assert!(doc.tags().is_empty());
    assert!(doc.checks().is_empty());
    assert_eq!(doc.service_regex(), None);
    assert!(!doc.metadata().contains_key("host_config"));
    assert_eq!(doc.metadata().get(IDENTITY_FIELD), Some(&Value::Bool(true)));
    assert_eq!(doc.name(), "web");
}

// ── Serialization ───────────────────────────────────────────────────

#[test]
fn to_mapping_has_every_attribute() {
    let map = web_rules().to_mapping();
    let keys: Vec<&str> = map.keys().filter_map(Value::as_str).collect();
    assert_eq!(keys, ["checks", "metadata", "name", "service_regex", "tags"]);
    assert_eq!(map.get("name").and_then(Value::as_str), Some("web"));
}

#[test]
fn to_yaml_sorts_nested_keys() {
    let yaml = RuleDocument::new("svc", "metadata:\n  zeta: true\n  alpha: true\n")
        .unwrap()
        .to_yaml()
        .unwrap();
    let alpha = yaml.find("alpha").unwrap();
    let id = yaml.find("id:").unwrap();
    let zeta = yaml.find("zeta").unwrap();
    assert!(alpha < id && id < zeta, "{yaml}");
}

#[test]
fn round_trip_through_yaml() {
    let doc = web_rules();
    let reloaded = RuleDocument::new(doc.name(), &doc.to_yaml().unwrap()).unwrap();
    assert_eq!(reloaded, doc);
    assert_eq!(reloaded.checks(), doc.checks());
    assert_eq!(reloaded.metadata(), doc.metadata());
    assert_eq!(reloaded.service_regex(), doc.service_regex());
    assert_eq!(reloaded.tags(), doc.tags());
}

#[test]
fn round_trip_with_no_pattern() {
    let doc = RuleDocument::new("svc", "tags: [docker]\n").unwrap();
    let reloaded = RuleDocument::new("svc", &doc.to_yaml().unwrap()).unwrap();
    assert_eq!(reloaded, doc);
    assert_eq!(reloaded.service_regex(), None);
}

#[test]
fn serialize_matches_to_mapping() {
    let doc = web_rules();
    let via_serde: Value = serde_yaml::to_value(&doc).unwrap();
    assert_eq!(via_serde, Value::Mapping(doc.to_mapping()));
}

// ── Content hash ────────────────────────────────────────────────────

#[test]
fn content_hash_is_stable() {
    let doc = web_rules();
    let first = doc.content_hash().unwrap();
    assert_eq!(first, doc.content_hash().unwrap());
    assert_eq!(first.len(), 64);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn equal_documents_hash_equal_regardless_of_key_order() {
    let a = RuleDocument::new("svc", "metadata: {a: true, b: true}\ntags: [x]\n").unwrap();
    let b = RuleDocument::new("svc", "tags: [x]\nmetadata: {b: true, a: true}\n").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
}

#[test]
fn any_attribute_change_changes_hash() {
    let base = web_rules().content_hash().unwrap();
    let variants = [
        WEB_RULES_YAML.replace("- web", "- api"),
        WEB_RULES_YAML.replace("10s", "20s"),
        WEB_RULES_YAML.replace("^web-.*", "^api-.*"),
        WEB_RULES_YAML.replace("image: true", "image: false"),
    ];
    for text in variants {
        let doc = RuleDocument::new("web", &text).unwrap();
        assert_ne!(doc.content_hash().unwrap(), base, "{text}");
    }
    let renamed = RuleDocument::new("web2", WEB_RULES_YAML).unwrap();
    assert_ne!(renamed.content_hash().unwrap(), base);
}

// ── Editor flows ────────────────────────────────────────────────────

#[test]
fn edit_without_editor_fails_before_io() {
    let mut doc = web_rules();
    let before = doc.clone();
    let err = doc.edit(&EditorConfig::unset()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(doc, before);
}

#[test]
fn create_without_editor_is_configuration_error() {
    let err = RuleDocument::create_default(&EditorConfig::unset()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[cfg(unix)]
#[test]
fn create_with_untouched_template() {
    let doc = RuleDocument::create("billing", &EditorConfig::with_command("true")).unwrap();
    assert_eq!(doc.name(), "billing");
    assert_eq!(doc.service_regex(), Some(crate::template::DEFAULT_SERVICE_REGEX));
    assert_eq!(doc.tags().first().map(String::as_str), Some("docker"));
    assert_eq!(doc.checks().len(), 4);
    assert_eq!(doc.metadata().get(IDENTITY_FIELD), Some(&Value::Bool(true)));
}

#[cfg(unix)]
#[test]
fn create_default_uses_default_label() {
    let doc = RuleDocument::create_default(&EditorConfig::with_command("true")).unwrap();
    assert_eq!(doc.name(), DEFAULT_SERVICE);
}

#[cfg(unix)]
#[test]
fn create_propagates_validation_failure() {
    let (_dir, editor) = writing_editor("tags: [a]\nextra: 1\n");
    let err = RuleDocument::create("svc", &editor).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownField);
}

#[cfg(unix)]
#[test]
fn edit_untouched_keeps_hash() {
    let mut doc = web_rules();
    let before = doc.content_hash().unwrap();
    doc.edit(&EditorConfig::with_command("true")).unwrap();
    assert_eq!(doc.content_hash().unwrap(), before);
    assert_eq!(doc, web_rules());
}

#[cfg(unix)]
#[test]
fn edit_replaces_attributes() {
    let mut doc = web_rules();
    let before = doc.content_hash().unwrap();
    let (_dir, editor) = writing_editor("metadata:\n  image: true\n");
    doc.edit(&editor).unwrap();

    assert!(doc.tags().is_empty(), "tags must reset on full replace");
    assert!(doc.checks().is_empty());
    assert_eq!(doc.metadata().get(IDENTITY_FIELD), Some(&Value::Bool(true)));
    assert_ne!(doc.content_hash().unwrap(), before);
}

#[cfg(unix)]
#[test]
fn edit_with_invalid_result_leaves_document_unchanged() {
    let mut doc = web_rules();
    let before = doc.clone();
    let (_dir, editor) = writing_editor("tags: [\n");
    let err = doc.edit(&editor).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert_eq!(doc, before);
}
