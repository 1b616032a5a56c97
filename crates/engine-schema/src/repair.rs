use serde_json::Value;

/// Default instance for a JSON Schema primitive type name, used when a
/// required field is missing or present with the wrong type.
///
/// Repair never invents content — it only satisfies structural requirements
/// (spec §4.2): missing arrays become `[]`, missing objects become `{}`,
/// missing strings become `""`. Wrong-typed fields are coerced to the same
/// empty instance rather than dropped, so a partially-valid document keeps
/// every field its schema names.
fn empty_instance_for(declared_type: &str) -> Option<Value> {
    match declared_type {
        "array" => Some(Value::Array(vec![])),
        "object" => Some(Value::Object(serde_json::Map::new())),
        "string" => Some(Value::String(String::new())),
        _ => None,
    }
}

fn declared_type<'a>(property_schema: &'a Value) -> Option<&'a str> {
    match property_schema.get("type") {
        Some(Value::String(s)) => Some(s.as_str()),
        // `"type": ["string", "null"]` — pick the first non-null alternative,
        // since a repair must produce *some* concrete instance.
        Some(Value::Array(alts)) => alts
            .iter()
            .filter_map(|v| v.as_str())
            .find(|s| *s != "null"),
        _ => None,
    }
}

fn value_matches_type(value: &Value, declared: &str) -> bool {
    match declared {
        "array" => value.is_array(),
        "object" => value.is_object(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// Repair a document in place against a single (non-recursive, top-level)
/// object schema. Returns the number of fields that were added or coerced.
///
/// Only top-level `required` fields of type `array`, `object`, or `string`
/// are repairable — anything else (a missing required number, say) is left
/// alone and will surface as a validation error, since there is no safe
/// "empty" numeric default that wouldn't be inventing content.
pub fn repair_object(doc: &mut Value, schema: &Value) -> usize {
    let Some(obj) = doc.as_object_mut() else {
        return 0;
    };
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return 0;
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut repaired = 0;
    for field in required {
        let Some(prop_schema) = properties.get(field) else {
            continue;
        };
        let Some(ty) = declared_type(prop_schema) else {
            continue;
        };

        match obj.get(field) {
            None => {
                if let Some(empty) = empty_instance_for(ty) {
                    obj.insert(field.to_string(), empty);
                    repaired += 1;
                }
            }
            Some(existing) if !value_matches_type(existing, ty) => {
                if let Some(empty) = empty_instance_for(ty) {
                    obj.insert(field.to_string(), empty);
                    repaired += 1;
                }
            }
            _ => {}
        }
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fills_missing_array_fields() {
        let schema = json!({
            "type": "object",
            "required": ["claims", "jargon"],
            "properties": {
                "claims": { "type": "array" },
                "jargon": { "type": "array" }
            }
        });
        let mut doc = json!({ "claims": [] });
        let n = repair_object(&mut doc, &schema);
        assert_eq!(n, 1);
        assert_eq!(doc["jargon"], json!([]));
    }

    #[test]
    fn coerces_wrong_typed_field_to_empty_rather_than_dropping() {
        let schema = json!({
            "type": "object",
            "required": ["notes"],
            "properties": { "notes": { "type": "string" } }
        });
        let mut doc = json!({ "notes": 42 });
        let n = repair_object(&mut doc, &schema);
        assert_eq!(n, 1);
        assert_eq!(doc["notes"], json!(""));
    }

    #[test]
    fn never_touches_a_field_with_no_declared_type() {
        let schema = json!({
            "type": "object",
            "required": ["count"],
            "properties": { "count": { "type": "integer" } }
        });
        let mut doc = json!({});
        let n = repair_object(&mut doc, &schema);
        assert_eq!(n, 0);
        assert!(doc.get("count").is_none());
    }
}
