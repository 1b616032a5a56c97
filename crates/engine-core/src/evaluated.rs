use serde::{Deserialize, Serialize};

use crate::ids::ClaimId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    A,
    B,
    C,
}

impl Tier {
    /// `tier = A` iff `importance >= 8`; `B` iff `6 <= importance < 8`; `C`
    /// iff `4 <= importance < 6`. Below 4 has no tier — the claim is
    /// rejected (spec §3 invariant). Returns `None` below the rejection
    /// threshold.
    pub fn from_importance(importance: u8) -> Option<Tier> {
        match importance {
            8..=10 => Some(Tier::A),
            6 | 7 => Some(Tier::B),
            4 | 5 => Some(Tier::C),
            _ => None,
        }
    }
}

/// Derived from a [`crate::miner::MinedClaim`] plus the Flagship Evaluator's
/// scores (spec §3 / §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatedClaim {
    pub claim_id: ClaimId,
    pub canonical: String,
    pub decision: Decision,
    pub importance: u8,
    pub novelty: u8,
    pub confidence_final: u8,
    /// `None` when `decision == Reject` — rejected claims carry no tier.
    pub tier: Option<Tier>,
    /// Dense rank (1..N) over accepted claims within the episode.
    pub rank: Option<u32>,
    pub reasoning: String,
    /// Timestamp (seconds) of the originating claim, used for the
    /// earlier-timestamp tie-break (spec §4.4).
    pub timestamp: f64,
    /// Importance as scored before any Taste Filter "Positive Echo" boost was
    /// applied, preserved for audit (spec §9).
    #[serde(default)]
    pub pre_boost_importance: Option<u8>,
}

impl EvaluatedClaim {
    pub fn tier_matches_importance(&self) -> bool {
        match self.decision {
            Decision::Reject => self.tier.is_none(),
            Decision::Accept => self.tier == Tier::from_importance(self.importance),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AverageScores {
    pub importance: f64,
    pub novelty: f64,
    pub confidence: f64,
}

/// Per-episode evaluator summary (spec §4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryAssessment {
    pub total_claims_processed: u32,
    pub claims_accepted: u32,
    pub claims_rejected: u32,
    pub key_themes: Vec<String>,
    pub average_scores: AverageScores,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_bands_match_spec() {
        assert_eq!(Tier::from_importance(10), Some(Tier::A));
        assert_eq!(Tier::from_importance(8), Some(Tier::A));
        assert_eq!(Tier::from_importance(7), Some(Tier::B));
        assert_eq!(Tier::from_importance(6), Some(Tier::B));
        assert_eq!(Tier::from_importance(5), Some(Tier::C));
        assert_eq!(Tier::from_importance(4), Some(Tier::C));
        assert_eq!(Tier::from_importance(3), None);
        assert_eq!(Tier::from_importance(0), None);
    }
}
