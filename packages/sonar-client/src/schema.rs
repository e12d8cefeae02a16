//! Schema generation for Sonar structured outputs.
//!
//! Sonar's `json_schema` response format follows the schema only when it is a
//! single self-contained document, so the `schemars` output is flattened:
//! every `$ref` is inlined, object schemas are closed and list every property
//! as required, and the `definitions`/`$schema` keys are dropped.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types that can be requested as a structured answer.
///
/// Blanket-implemented for anything `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Self-contained JSON schema for this type.
    fn sonar_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        close_object_schemas(&mut value);
        inline_refs(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    /// Schema name of this type.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                let keys = map.get("properties").and_then(Value::as_object).map(|props| {
                    props
                        .keys()
                        .map(|k| Value::String(k.clone()))
                        .collect::<Vec<_>>()
                });
                if let Some(keys) = keys {
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }

            for (_, v) in map.iter_mut() {
                close_object_schemas(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_object_schemas),
        _ => {}
    }
}

fn inline_refs(value: &mut Value) {
    let definitions = value.get("definitions").cloned();
    if let Some(defs) = definitions {
        inline_refs_with(value, &defs);
    }
}

fn inline_refs_with(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();

            if let Some(def) = target {
                *value = def;
                inline_refs_with(value, definitions);
                return;
            }

            for (_, v) in map.iter_mut() {
                inline_refs_with(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_refs_with(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    #[allow(dead_code)]
    enum Grade {
        Pass,
        Fail,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Item {
        label: String,
        grade: Grade,
        note: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Report {
        title: String,
        items: Vec<Item>,
    }

    #[test]
    fn test_root_has_no_definitions_or_meta() {
        let schema = Report::sonar_schema();
        let obj = schema.as_object().unwrap();

        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));
        assert_eq!(obj["type"], "object");
    }

    #[test]
    fn test_no_refs_remain() {
        let text = serde_json::to_string(&Report::sonar_schema()).unwrap();
        assert!(!text.contains("$ref"), "refs should be inlined: {}", text);
    }

    #[test]
    fn test_nested_objects_are_closed_and_fully_required() {
        let schema = Report::sonar_schema();
        let item = &schema["properties"]["items"]["items"];

        assert_eq!(item["type"], "object");
        assert_eq!(item["additionalProperties"], Value::Bool(false));

        let required: Vec<&str> = item["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"label"));
        assert!(required.contains(&"grade"));
        assert!(required.contains(&"note"));
    }

    #[test]
    fn test_enum_values_survive_inlining() {
        let schema = Report::sonar_schema();
        let grade = &schema["properties"]["items"]["items"]["properties"]["grade"];
        let values: Vec<&str> = grade["enum"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();

        assert_eq!(values, vec!["PASS", "FAIL"]);
    }
}
