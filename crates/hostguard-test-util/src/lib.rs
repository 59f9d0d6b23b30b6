//! Shared test utilities for the hostguard workspace.

use serde_json::Value;

const TIMESTAMP_KEYS: [&str; 2] = ["started_at", "finished_at"];

/// Normalize non-deterministic JSON fields for golden-file comparison.
///
/// 1. **Root-only**: `tool.version` becomes `"__VERSION__"` when the root object
///    is a report envelope (`schema`, `tool`, `host`, `rules`, `report`). Outcome
///    data that happens to carry a `tool` object is left alone.
/// 2. **Recursive**: `started_at` and `finished_at` become `"__TIMESTAMP__"` at
///    any depth.
pub fn normalize_nondeterministic(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        let is_envelope = ["schema", "tool", "host", "rules", "report"]
            .iter()
            .all(|k| obj.contains_key(*k));
        if is_envelope
            && let Some(tool) = obj.get_mut("tool").and_then(Value::as_object_mut)
            && tool.contains_key("version")
        {
            tool.insert(
                "version".to_string(),
                Value::String("__VERSION__".to_string()),
            );
        }
    }
    normalize_timestamps_recursive(&mut value);
    value
}

fn normalize_timestamps_recursive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in TIMESTAMP_KEYS {
                if map.contains_key(key) {
                    map.insert(key.to_string(), Value::String("__TIMESTAMP__".to_string()));
                }
            }
            for val in map.values_mut() {
                normalize_timestamps_recursive(val);
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                normalize_timestamps_recursive(val);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_only_touches_envelope_tool_version() {
        let input = json!({
            "schema": "hostguard.audit.v1",
            "tool": { "name": "hostguard", "version": "0.1.0" },
            "started_at": "2026-01-01T00:00:00Z",
            "finished_at": "2026-01-01T00:00:01Z",
            "host": { "host_id": "web-01", "os_identifier": "CentOS Linux-7" },
            "rules": ["cis.centos"],
            "report": {
                "Failure": [
                    { "tag": "CIS-1", "module": "grep", "data": { "tool": { "version": "1.2" } } }
                ]
            }
        });

        let result = normalize_nondeterministic(input);
        assert_eq!(result["tool"]["version"], "__VERSION__");
        assert_eq!(result["tool"]["name"], "hostguard");
        assert_eq!(result["started_at"], "__TIMESTAMP__");
        assert_eq!(result["finished_at"], "__TIMESTAMP__");
        assert_eq!(
            result["report"]["Failure"][0]["data"]["tool"]["version"],
            "1.2"
        );
    }

    #[test]
    fn non_envelope_keeps_tool_version() {
        let input = json!({ "tool": { "name": "x", "version": "9" } });
        assert_eq!(normalize_nondeterministic(input.clone()), input);
    }

    #[test]
    fn nested_timestamps_are_normalized() {
        let input = json!([{ "started_at": "a" }, { "inner": { "finished_at": "b" } }]);
        let result = normalize_nondeterministic(input);
        assert_eq!(result[0]["started_at"], "__TIMESTAMP__");
        assert_eq!(result[1]["inner"]["finished_at"], "__TIMESTAMP__");
    }
}
