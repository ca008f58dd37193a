//! Type-safe schema generation for OpenAI structured outputs.
//!
//! ```rust,ignore
//! #[derive(Deserialize, JsonSchema)]
//! struct DeclaredTotal {
//!     total: Option<f64>,
//! }
//!
//! let schema = DeclaredTotal::openai_schema();
//! ```

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// Trait for types that can be used as OpenAI structured output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate an OpenAI-compatible JSON schema for this type.
    ///
    /// Strict mode wants every subschema inlined, `additionalProperties: false`
    /// on every object and every property listed in `required`.
    fn openai_schema() -> serde_json::Value {
        let schema = SchemaSettings::draft07()
            .with(|s| {
                s.inline_subschemas = true;
                s.meta_schema = None;
            })
            .into_generator()
            .into_root_schema_for::<Self>();

        let mut value = serde_json::to_value(schema).unwrap_or_default();
        close_objects(&mut value);

        if let serde_json::Value::Object(map) = &mut value {
            map.remove("definitions");
        }
        value
    }

    /// Get the schema name for this type.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_objects(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.get("type").and_then(|t| t.as_str()) == Some("object") {
                map.insert("additionalProperties".into(), serde_json::Value::Bool(false));

                if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                    let required = props
                        .keys()
                        .map(|k| serde_json::Value::String(k.clone()))
                        .collect();
                    map.insert("required".into(), serde_json::Value::Array(required));
                }
            }
            for (_, v) in map.iter_mut() {
                close_objects(v);
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Line {
        reference: String,
        quantity: Option<f64>,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Note {
        lines: Vec<Line>,
        total: Option<f64>,
    }

    #[test]
    fn test_schema_is_closed_and_fully_required() {
        let schema = Note::openai_schema();
        let obj = schema.as_object().unwrap();

        assert!(!obj.contains_key("$schema"));
        assert!(!obj.contains_key("definitions"));
        assert_eq!(obj["additionalProperties"], serde_json::Value::Bool(false));

        let required: Vec<&str> = obj["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"lines"));
        assert!(required.contains(&"total"));
    }

    #[test]
    fn test_nested_objects_are_inlined() {
        let schema = Note::openai_schema();
        let items = &schema["properties"]["lines"]["items"];

        assert!(items.get("$ref").is_none(), "nested type should be inlined");
        assert_eq!(items["type"], "object");
        assert_eq!(items["additionalProperties"], serde_json::Value::Bool(false));

        let required: Vec<&str> = items["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"quantity"), "nullable fields stay required");
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Note::type_name(), "Note");
    }
}
