use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::{debug, warn};

use crate::repair::repair_object;

struct CompiledSchema {
    raw: Value,
    compiled: JSONSchema,
}

/// Versioned JSON Schemas for every LLM I/O document the Engine validates.
///
/// Both `{name}.v{n}` and a bare `{name}` alias are registered for every
/// schema file bundled under `src/schemas/`; the alias always points at the
/// highest version seen for that name (spec §4.2).
pub struct SchemaRegistry {
    schemas: HashMap<String, CompiledSchema>,
}

/// Schema files embedded at compile time — `(versioned_name, json_text)`.
/// Adding a new schema means adding a file under `src/schemas/` and a line
/// here; there is no runtime schema directory to keep in sync.
const EMBEDDED_SCHEMAS: &[(&str, &str)] = &[
    (
        "miner_input.v1",
        include_str!("schemas/miner_input.v1.json"),
    ),
    (
        "miner_output.v1",
        include_str!("schemas/miner_output.v1.json"),
    ),
    (
        "flagship_input.v1",
        include_str!("schemas/flagship_input.v1.json"),
    ),
    (
        "flagship_output.v1",
        include_str!("schemas/flagship_output.v1.json"),
    ),
    (
        "question_discovery_output.v1",
        include_str!("schemas/question_discovery_output.v1.json"),
    ),
    (
        "question_merge_output.v1",
        include_str!("schemas/question_merge_output.v1.json"),
    ),
    (
        "question_assignment_output.v1",
        include_str!("schemas/question_assignment_output.v1.json"),
    ),
];

impl SchemaRegistry {
    pub fn new() -> Result<Self> {
        let mut schemas = HashMap::new();
        let mut latest_version: HashMap<String, u32> = HashMap::new();

        for (versioned_name, text) in EMBEDDED_SCHEMAS {
            let raw: Value =
                serde_json::from_str(text).with_context(|| format!("parsing {versioned_name}"))?;
            let compiled = JSONSchema::compile(&raw)
                .map_err(|e| anyhow::anyhow!("compiling {versioned_name}: {e}"))?;

            let (base, version) = split_versioned_name(versioned_name)?;
            schemas.insert(
                versioned_name.to_string(),
                CompiledSchema {
                    raw: raw.clone(),
                    compiled,
                },
            );

            let is_newer = latest_version.get(&base).is_none_or(|&v| version > v);
            if is_newer {
                latest_version.insert(base.clone(), version);
                let compiled_alias = JSONSchema::compile(&raw)
                    .map_err(|e| anyhow::anyhow!("compiling alias {base}: {e}"))?;
                schemas.insert(
                    base,
                    CompiledSchema {
                        raw,
                        compiled: compiled_alias,
                    },
                );
            }
        }

        debug!(schemas = schemas.len(), "schema registry loaded");
        Ok(Self { schemas })
    }

    /// Validate `doc` against the named schema (either `"{name}.v{n}"` or the
    /// bare current-version alias). Returns the list of validation error
    /// messages, empty when valid.
    pub fn validate(&self, doc: &Value, schema_name: &str) -> Result<(bool, Vec<String>)> {
        let entry = self
            .schemas
            .get(schema_name)
            .with_context(|| format!("unknown schema: {schema_name}"))?;

        match entry.compiled.validate(doc) {
            Ok(()) => Ok((true, vec![])),
            Err(errors) => Ok((false, errors.map(|e| e.to_string()).collect())),
        }
    }

    /// Repair `doc` against the named schema's structural requirements, then
    /// re-validate. If the repair does not make the document valid, the
    /// repair is effectively a no-op from the caller's perspective: the
    /// (unchanged) errors are returned alongside the attempted repair.
    ///
    /// Repair-then-validate on an already-valid document returns it
    /// unchanged (spec §8 round-trip property).
    pub fn repair_and_validate(
        &self,
        mut doc: Value,
        schema_name: &str,
    ) -> Result<(Value, bool, Vec<String>)> {
        let (is_valid, errors) = self.validate(&doc, schema_name)?;
        if is_valid {
            return Ok((doc, true, errors));
        }

        let entry = self
            .schemas
            .get(schema_name)
            .with_context(|| format!("unknown schema: {schema_name}"))?;

        let repaired_count = repair_object(&mut doc, &entry.raw);
        let (is_valid_after, errors_after) = self.validate(&doc, schema_name)?;

        if repaired_count > 0 {
            debug!(schema_name, repaired_count, is_valid_after, "repaired document");
        }
        if !is_valid_after {
            warn!(schema_name, errors = ?errors_after, "document still invalid after repair");
        }

        Ok((doc, is_valid_after, errors_after))
    }

    /// Pretty-printed raw schema text, for splicing into a prompt's
    /// "output schema" block (spec §4.3 static prefix).
    pub fn raw_schema_text(&self, schema_name: &str) -> Result<String> {
        let entry = self
            .schemas
            .get(schema_name)
            .with_context(|| format!("unknown schema: {schema_name}"))?;
        Ok(serde_json::to_string_pretty(&entry.raw)?)
    }
}

fn split_versioned_name(versioned_name: &str) -> Result<(String, u32)> {
    let Some((base, version_part)) = versioned_name.rsplit_once(".v") else {
        bail!("schema name '{versioned_name}' is not in '{{name}}.v{{n}}' form");
    };
    let version: u32 = version_part.parse()?;
    Ok((base.to_string(), version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registers_both_versioned_and_base_names() {
        let registry = SchemaRegistry::new().unwrap();
        assert!(registry.schemas.contains_key("miner_output.v1"));
        assert!(registry.schemas.contains_key("miner_output"));
    }

    #[test]
    fn missing_optional_arrays_are_repaired() {
        let registry = SchemaRegistry::new().unwrap();
        let doc = json!({
            "segment_id": "s1",
            "claims": []
        });
        let (repaired, is_valid, errors) = registry
            .repair_and_validate(doc, "miner_output")
            .unwrap();
        assert!(is_valid, "errors: {errors:?}");
        assert_eq!(repaired["jargon"], json!([]));
        assert_eq!(repaired["people"], json!([]));
        assert_eq!(repaired["mental_models"], json!([]));
    }

    #[test]
    fn already_valid_document_is_unchanged() {
        let registry = SchemaRegistry::new().unwrap();
        let doc = json!({
            "segment_id": "s1",
            "claims": [],
            "jargon": [],
            "people": [],
            "mental_models": []
        });
        let (repaired, is_valid, _) = registry
            .repair_and_validate(doc.clone(), "miner_output")
            .unwrap();
        assert!(is_valid);
        assert_eq!(repaired, doc);
    }

    #[test]
    fn invalid_document_reports_errors_when_repair_cannot_help() {
        let registry = SchemaRegistry::new().unwrap();
        // `evaluated_claims` is present but has the wrong top-level type
        // (object instead of array) and `summary_assessment` is missing a
        // required *integer* field nested inside it — repair only touches
        // the outer object's own required fields, so the inner problem
        // survives.
        let doc = json!({
            "evaluated_claims": [],
            "summary_assessment": { "total_claims_processed": 1 }
        });
        let (_, is_valid, errors) = registry
            .repair_and_validate(doc, "flagship_output")
            .unwrap();
        assert!(!is_valid);
        assert!(!errors.is_empty());
    }
}
