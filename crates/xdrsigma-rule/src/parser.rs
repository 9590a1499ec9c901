//! YAML → AST parser for Sigma detection rules.
//!
//! Handles:
//! - Single-document YAML (one rule)
//! - Multi-document YAML (`---` separator)
//! - Detection section parsing (named detections, field modifiers, values)
//!
//! Per-document parse errors are collected in the returned collection; a
//! malformed document never fails the whole batch.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::ast::*;
use crate::condition::parse_condition;
use crate::error::{Result, RuleError};
use crate::value::SigmaValue;

// =============================================================================
// Public API
// =============================================================================

/// Parse a YAML string containing one or more Sigma rule documents.
pub fn parse_sigma_yaml(yaml: &str) -> Result<SigmaCollection> {
    let mut collection = SigmaCollection::new();

    for doc in serde_yaml::Deserializer::from_str(yaml) {
        let value: Value = match Value::deserialize(doc) {
            Ok(v) => v,
            Err(e) => {
                collection.errors.push(format!("YAML parse error: {e}"));
                continue;
            }
        };

        match parse_rule(&value) {
            Ok(rule) => collection.rules.push(rule),
            Err(e) => collection.errors.push(e.to_string()),
        }
    }

    Ok(collection)
}

/// Parse a Sigma YAML file from a path.
pub fn parse_sigma_file(path: &Path) -> Result<SigmaCollection> {
    let content = std::fs::read_to_string(path)?;
    parse_sigma_yaml(&content)
}

/// Parse a single rule from a YAML value.
pub fn parse_rule(value: &Value) -> Result<SigmaRule> {
    let m = value
        .as_mapping()
        .ok_or_else(|| RuleError::InvalidRule("Document is not a YAML mapping".into()))?;

    let title = get_str(m, "title")
        .ok_or_else(|| RuleError::MissingField("title".into()))?
        .to_string();

    let detection_val = m
        .get(val_key("detection"))
        .ok_or_else(|| RuleError::MissingField("detection".into()))?;
    let detection = parse_detections(detection_val)?;

    let logsource = m
        .get(val_key("logsource"))
        .map(parse_logsource)
        .transpose()?
        .unwrap_or_default();

    Ok(SigmaRule {
        title,
        id: get_str(m, "id").map(|s| s.to_string()),
        status: get_str(m, "status").and_then(Status::from_str),
        description: get_str(m, "description").map(|s| s.to_string()),
        author: get_str(m, "author").map(|s| s.to_string()),
        references: get_str_list(m, "references"),
        date: get_str(m, "date").map(|s| s.to_string()),
        modified: get_str(m, "modified").map(|s| s.to_string()),
        logsource,
        detection,
        falsepositives: get_str_list(m, "falsepositives"),
        level: get_str(m, "level").and_then(Level::from_str),
        tags: get_str_list(m, "tags"),
    })
}

// =============================================================================
// Log source
// =============================================================================

fn parse_logsource(value: &Value) -> Result<LogSource> {
    let m = value
        .as_mapping()
        .ok_or_else(|| RuleError::InvalidRule("logsource must be a mapping".into()))?;

    Ok(LogSource {
        category: get_str(m, "category").map(|s| s.to_string()),
        product: get_str(m, "product").map(|s| s.to_string()),
        service: get_str(m, "service").map(|s| s.to_string()),
        definition: get_str(m, "definition").map(|s| s.to_string()),
    })
}

// =============================================================================
// Detection section
// =============================================================================

/// Parse the `detection:` section of a rule.
fn parse_detections(value: &Value) -> Result<Detections> {
    let m = value
        .as_mapping()
        .ok_or_else(|| RuleError::InvalidDetection("detection must be a mapping".into()))?;

    let mut named = HashMap::new();
    let mut condition_strings = Vec::new();

    for (key, val) in m {
        let name = key
            .as_str()
            .ok_or_else(|| RuleError::InvalidDetection("detection keys must be strings".into()))?;

        if name == "condition" {
            condition_strings = match val {
                Value::String(s) => vec![s.clone()],
                Value::Sequence(seq) => seq
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
                _ => {
                    return Err(RuleError::InvalidDetection(
                        "condition must be a string or list of strings".into(),
                    ));
                }
            };
            continue;
        }

        named.insert(name.to_string(), parse_detection(val)?);
    }

    if condition_strings.is_empty() {
        return Err(RuleError::MissingField("detection.condition".into()));
    }

    let conditions = condition_strings
        .iter()
        .map(|s| parse_condition(s))
        .collect::<Result<Vec<_>>>()?;

    Ok(Detections {
        named,
        conditions,
        condition_strings,
    })
}

/// Parse one named detection body.
///
/// - A mapping is a conjunction of its field/value entries.
/// - A list of mappings is a disjunction of conjunctions.
/// - A list of scalars is a keyword list.
fn parse_detection(value: &Value) -> Result<Detection> {
    match value {
        Value::Mapping(m) => parse_detection_mapping(m),

        Value::Sequence(seq) => {
            if seq.iter().all(|v| v.as_mapping().is_some()) && !seq.is_empty() {
                let subs = seq
                    .iter()
                    .map(parse_detection)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Detection::AnyOf(subs))
            } else {
                let values = seq.iter().map(SigmaValue::from_yaml).collect();
                Ok(Detection::Keywords(values))
            }
        }

        other => Err(RuleError::InvalidDetection(format!(
            "detection body must be a mapping or list, got: {other:?}"
        ))),
    }
}

fn parse_detection_mapping(m: &Mapping) -> Result<Detection> {
    let mut items = Vec::new();

    for (key, val) in m {
        let spec = key
            .as_str()
            .ok_or_else(|| RuleError::InvalidDetection("field keys must be strings".into()))?;

        let (field, modifiers) = parse_field_spec(spec)?;

        let values = match val {
            Value::Sequence(seq) => seq.iter().map(SigmaValue::from_yaml).collect(),
            scalar => vec![SigmaValue::from_yaml(scalar)],
        };

        items.push(Detection::Item(DetectionItem {
            field,
            modifiers,
            values,
        }));
    }

    Ok(Detection::AllOf(items))
}

/// Split a `Field|modifier1|modifier2` key into name and modifiers.
pub fn parse_field_spec(spec: &str) -> Result<(Option<String>, Vec<Modifier>)> {
    let mut parts = spec.split('|');
    let name = parts.next().unwrap_or_default();
    let field = if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    };

    let modifiers = parts
        .map(|p| Modifier::from_str(p).ok_or_else(|| RuleError::UnknownModifier(p.to_string())))
        .collect::<Result<Vec<_>>>()?;

    Ok((field, modifiers))
}

// =============================================================================
// YAML access helpers
// =============================================================================

fn val_key(s: &str) -> Value {
    Value::String(s.to_string())
}

fn get_str<'a>(m: &'a Mapping, key: &str) -> Option<&'a str> {
    m.get(val_key(key)).and_then(|v| v.as_str())
}

fn get_str_list(m: &Mapping, key: &str) -> Vec<String> {
    match m.get(val_key(key)) {
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PROCESS_RULE: &str = r#"
title: Detect Whoami
id: 9c8b9f4a-3c19-4b6b-8f8f-3a7f4d9e2c11
status: test
logsource:
    product: windows
    category: process_creation
detection:
    selection:
        CommandLine|contains: 'whoami'
        Image|endswith:
            - '\cmd.exe'
            - '\powershell.exe'
    condition: selection
level: medium
tags:
    - attack.discovery
"#;

    #[test]
    fn test_parse_process_rule() {
        let collection = parse_sigma_yaml(PROCESS_RULE).unwrap();
        assert!(collection.errors.is_empty(), "{:?}", collection.errors);
        assert_eq!(collection.rules.len(), 1);

        let rule = &collection.rules[0];
        assert_eq!(rule.title, "Detect Whoami");
        assert_eq!(rule.status, Some(Status::Test));
        assert_eq!(rule.level, Some(Level::Medium));
        assert_eq!(rule.logsource.category.as_deref(), Some("process_creation"));
        assert_eq!(rule.logsource.product.as_deref(), Some("windows"));

        let selection = &rule.detection.named["selection"];
        match selection {
            Detection::AllOf(items) => {
                assert_eq!(items.len(), 2);
                match &items[0] {
                    Detection::Item(item) => {
                        assert_eq!(item.field.as_deref(), Some("CommandLine"));
                        assert_eq!(item.modifiers, vec![Modifier::Contains]);
                        assert_eq!(item.values.len(), 1);
                    }
                    other => panic!("expected Item, got {other:?}"),
                }
                match &items[1] {
                    Detection::Item(item) => {
                        assert_eq!(item.field.as_deref(), Some("Image"));
                        assert_eq!(item.values.len(), 2);
                    }
                    other => panic!("expected Item, got {other:?}"),
                }
            }
            other => panic!("expected AllOf, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_of_maps_is_disjunction() {
        let yaml = r#"
title: List Selection
logsource:
    category: process_creation
detection:
    selection:
        - Image: '\a.exe'
        - Image: '\b.exe'
    condition: selection
"#;
        let collection = parse_sigma_yaml(yaml).unwrap();
        let rule = &collection.rules[0];
        match &rule.detection.named["selection"] {
            Detection::AnyOf(subs) => assert_eq!(subs.len(), 2),
            other => panic!("expected AnyOf, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_keywords() {
        let yaml = r#"
title: Keywords
logsource:
    product: linux
detection:
    keywords:
        - 'rm -rf /'
        - 'mkfs'
    condition: keywords
"#;
        let collection = parse_sigma_yaml(yaml).unwrap();
        let rule = &collection.rules[0];
        match &rule.detection.named["keywords"] {
            Detection::Keywords(values) => assert_eq!(values.len(), 2),
            other => panic!("expected Keywords, got {other:?}"),
        }
    }

    #[test]
    fn test_null_value_is_exists_sentinel() {
        let yaml = r#"
title: Null Field
logsource:
    category: process_creation
detection:
    selection:
        ParentImage: null
    condition: selection
"#;
        let collection = parse_sigma_yaml(yaml).unwrap();
        let rule = &collection.rules[0];
        match &rule.detection.named["selection"] {
            Detection::AllOf(items) => match &items[0] {
                Detection::Item(item) => assert!(item.values[0].is_null()),
                other => panic!("expected Item, got {other:?}"),
            },
            other => panic!("expected AllOf, got {other:?}"),
        }
    }

    #[test]
    fn test_multi_document_collects_errors() {
        let yaml = r#"
title: Good Rule
logsource:
    category: process_creation
detection:
    selection:
        Image: '\cmd.exe'
    condition: selection
---
logsource:
    category: process_creation
detection:
    selection:
        Image: '\bad.exe'
    condition: selection
"#;
        let collection = parse_sigma_yaml(yaml).unwrap();
        assert_eq!(collection.rules.len(), 1);
        assert_eq!(collection.errors.len(), 1);
        assert!(collection.errors[0].contains("title"));
    }

    #[test]
    fn test_unknown_modifier_is_error() {
        let yaml = r#"
title: Bad Modifier
logsource:
    category: process_creation
detection:
    selection:
        CommandLine|frobnicate: 'x'
    condition: selection
"#;
        let collection = parse_sigma_yaml(yaml).unwrap();
        assert!(collection.rules.is_empty());
        assert!(collection.errors[0].contains("frobnicate"));
    }

    #[test]
    fn test_missing_condition_is_error() {
        let yaml = r#"
title: No Condition
logsource:
    category: process_creation
detection:
    selection:
        Image: '\cmd.exe'
"#;
        let collection = parse_sigma_yaml(yaml).unwrap();
        assert!(collection.rules.is_empty());
        assert!(collection.errors[0].contains("condition"));
    }
}
