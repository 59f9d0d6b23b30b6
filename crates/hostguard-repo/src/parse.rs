use anyhow::Context;
use hostguard_domain::model::RuleDocument;
use serde_json::{Map, Number, Value as JsonValue};
use serde_yaml::Value as YamlValue;

/// Parse YAML rule text into a typed [`RuleDocument`].
pub fn parse_rule_yaml(text: &str) -> anyhow::Result<RuleDocument> {
    let yaml: YamlValue = serde_yaml::from_str(text).context("parse rule YAML")?;
    let doc = RuleDocument::from_value(&yaml_to_json(yaml))?;
    Ok(doc)
}

/// Convert a YAML tree to JSON. Scalar mapping keys are stringified; keys
/// that are themselves collections are dropped. Tags are discarded.
pub fn yaml_to_json(value: YamlValue) -> JsonValue {
    match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(b),
        YamlValue::Number(n) => yaml_number(&n),
        YamlValue::String(s) => JsonValue::String(s),
        YamlValue::Sequence(items) => {
            JsonValue::Array(items.into_iter().map(yaml_to_json).collect())
        }
        YamlValue::Mapping(mapping) => {
            let mut out = Map::new();
            for (key, value) in mapping {
                if let Some(key) = key_text(&key) {
                    out.insert(key, yaml_to_json(value));
                }
            }
            JsonValue::Object(out)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> JsonValue {
    if let Some(i) = n.as_i64() {
        JsonValue::from(i)
    } else if let Some(u) = n.as_u64() {
        JsonValue::from(u)
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(n.to_string()))
    }
}

fn key_text(key: &YamlValue) -> Option<String> {
    match key {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Null => Some("null".to_string()),
        YamlValue::Tagged(tagged) => key_text(&tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostguard_domain::model::TagValue;
    use serde_json::json;

    #[test]
    fn numeric_keys_and_values_survive_conversion() {
        let yaml: YamlValue = serde_yaml::from_str("1: two\nthree: 4\nfive: 6.5\n").unwrap();
        assert_eq!(
            yaml_to_json(yaml),
            json!({"1": "two", "three": 4, "five": 6.5})
        );
    }

    #[test]
    fn parses_package_rules_with_structured_variants() {
        let doc = parse_rule_yaml(
            r#"
package:
  blacklist:
    telnet:
      data:
        'CentOS Linux-7':
          - telnet: CIS-2.1.1
        '*':
          - telnet: CIS-ANY
      description: telnet must not be installed
      labels: [cis, critical]
  whitelist:
    rsyslog:
      data:
        '*':
          - rsyslog:
              tag: CIS-5.1.1
              version: '>=8.0'
"#,
        )
        .unwrap();

        let telnet = &doc.package.blacklist[0];
        assert_eq!(telnet.check_id, "telnet");
        assert_eq!(telnet.definition.variants.len(), 2);
        assert_eq!(telnet.definition.variants[0].pattern, "CentOS Linux-7");
        assert!(telnet.definition.labels.contains("critical"));

        let rsyslog = &doc.package.whitelist[0];
        match &rsyslog.definition.variants[0].entries[0].value {
            TagValue::Structured(map) => assert_eq!(map["version"], ">=8.0"),
            other => panic!("expected structured value, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_an_empty_document() {
        assert_eq!(parse_rule_yaml("").unwrap(), RuleDocument::default());
    }

    #[test]
    fn non_mapping_document_is_rejected() {
        let err = parse_rule_yaml("- a\n- b\n").unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        assert!(parse_rule_yaml("package: [unclosed").is_err());
    }
}
