use engine_core::{EntityType, Verdict};
use serde::Deserialize;

const GOLDEN_JSON: &str = include_str!("assets/golden_feedback.json");

#[derive(Debug, Deserialize)]
pub struct GoldenExample {
    pub entity_type: EntityType,
    pub entity_text: String,
    pub verdict: Verdict,
    pub reason_category: String,
}

#[derive(Debug, Deserialize)]
struct GoldenFile {
    schema_version: String,
    examples: Vec<GoldenExample>,
}

/// Bundled golden-set exemplars and the version string `FeedbackStore::open`
/// compares against its stored `golden_version` key (spec §4.6 cold start).
pub struct GoldenSet {
    pub schema_version: String,
    pub examples: Vec<GoldenExample>,
}

pub fn load_bundled() -> anyhow::Result<GoldenSet> {
    let parsed: GoldenFile = serde_json::from_str(GOLDEN_JSON)?;
    Ok(GoldenSet {
        schema_version: parsed.schema_version,
        examples: parsed.examples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_golden_set_parses() {
        let golden = load_bundled().unwrap();
        assert!(!golden.schema_version.is_empty());
        assert!(!golden.examples.is_empty());
    }
}
