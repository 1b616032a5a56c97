use std::collections::HashSet;

use serde::Deserialize;

const REASONS_YAML: &str = include_str!("assets/reasons.yaml");

/// The fallback key every unrecognized `reason_category` is rewritten to
/// (spec §4.6 cold start paragraph).
pub const OTHER_REASON: &str = "other";

#[derive(Debug, Deserialize)]
struct ReasonEntry {
    key: String,
    #[allow(dead_code)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ReasonsFile {
    #[allow(dead_code)]
    schema_version: String,
    reasons: Vec<ReasonEntry>,
}

/// Configurable reasons taxonomy (spec §4.6: "YAML-driven"). Loaded once from
/// the bundled asset; user examples whose `reason_category` is not in this
/// set are rewritten to [`OTHER_REASON`] and logged.
pub struct ReasonsTaxonomy {
    known: HashSet<String>,
}

impl ReasonsTaxonomy {
    pub fn load_bundled() -> anyhow::Result<Self> {
        Self::parse(REASONS_YAML)
    }

    fn parse(yaml: &str) -> anyhow::Result<Self> {
        let parsed: ReasonsFile = serde_yaml::from_str(yaml)?;
        let known = parsed.reasons.into_iter().map(|r| r.key).collect();
        Ok(Self { known })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.known.contains(key)
    }

    /// Golden examples bypass this check entirely (spec §4.6); call only for
    /// user-submitted feedback.
    pub fn normalize(&self, reason_category: &str) -> String {
        if self.contains(reason_category) {
            reason_category.to_string()
        } else {
            tracing::warn!(
                reason_category,
                "unknown reason_category rewritten to 'other'"
            );
            OTHER_REASON.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_taxonomy_parses_and_contains_other() {
        let taxonomy = ReasonsTaxonomy::load_bundled().unwrap();
        assert!(taxonomy.contains(OTHER_REASON));
        assert!(taxonomy.contains("high_signal"));
    }

    #[test]
    fn unknown_reason_is_rewritten() {
        let taxonomy = ReasonsTaxonomy::load_bundled().unwrap();
        assert_eq!(taxonomy.normalize("not_a_real_reason"), OTHER_REASON);
        assert_eq!(taxonomy.normalize("high_signal"), "high_signal");
    }
}
