use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SegmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Factual,
    Causal,
    Normative,
    Forecast,
    Definition,
}

impl Default for ClaimType {
    /// Claim type defaults to `factual` when the miner's output left it
    /// ambiguous (spec §4.3).
    fn default() -> Self {
        ClaimType::Factual
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Asserts,
    Denies,
    Hedges,
    Questions,
}

impl Default for Stance {
    fn default() -> Self {
        Stance::Asserts
    }
}

/// A span within the source segment's text that backs an extracted item.
/// Every item must carry at least one of these — provenance is mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub quote: String,
    #[serde(default)]
    pub start_char: Option<usize>,
    #[serde(default)]
    pub end_char: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinedClaim {
    pub claim_text: String,
    #[serde(default)]
    pub claim_type: ClaimType,
    #[serde(default)]
    pub stance: Stance,
    pub context_quote: String,
    pub timestamp: f64,
    #[serde(default)]
    pub evidence_spans: Vec<EvidenceSpan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinedJargon {
    pub term: String,
    pub definition: String,
    pub context_quote: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinedPerson {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub context_quote: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinedMentalModel {
    pub name: String,
    pub description: String,
    pub context_quote: String,
    pub timestamp: f64,
}

/// Per-segment output of the Miner (spec §3). Conforms to the
/// `miner_output.v1` schema — see `engine-schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinerOutput {
    pub segment_id: SegmentId,
    #[serde(default)]
    pub claims: Vec<MinedClaim>,
    #[serde(default)]
    pub jargon: Vec<MinedJargon>,
    #[serde(default)]
    pub people: Vec<MinedPerson>,
    #[serde(default)]
    pub mental_models: Vec<MinedMentalModel>,
    /// Set when the segment's extraction failed schema validation even after
    /// one repair attempt (spec §4.3's "empty-with-error" outcome).
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub produced_at: Option<DateTime<Utc>>,
}

impl MinerOutput {
    pub fn empty_with_error(segment_id: SegmentId, error: impl Into<String>) -> Self {
        Self {
            segment_id,
            error: Some(error.into()),
            produced_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn is_empty_with_error(&self) -> bool {
        self.error.is_some()
    }

    /// True when none of the four arrays have any items — used to decide
    /// re-mining eligibility for "empty segments" (spec §4.5 Stage 3).
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
            && self.jargon.is_empty()
            && self.people.is_empty()
            && self.mental_models.is_empty()
    }
}
