use std::collections::HashMap;

use engine_core::{EntityType, Verdict};

use crate::store::FeedbackStore;

#[derive(Debug, Clone)]
pub struct TasteFilterConfig {
    pub discard_threshold: f64,
    pub flag_threshold: f64,
    pub boost_threshold: f64,
    pub positive_echo_boost: u8,
}

impl Default for TasteFilterConfig {
    fn default() -> Self {
        Self {
            discard_threshold: 0.95,
            flag_threshold: 0.80,
            boost_threshold: 0.95,
            positive_echo_boost: 2,
        }
    }
}

/// Outcome of running one item through the Taste Filter (spec §4.6). The
/// boost amount is a recommendation, not an applied score — `MinerOutput`
/// items carry no numeric importance yet, so the caller (the Engine
/// Orchestrator, once an `EvaluatedClaim.importance` exists) applies it at
/// the single well-defined point the redesign calls for: post-filter,
/// pre-evaluation decision, evaluation-time application, preserving the
/// original score in `EvaluatedClaim.pre_boost_importance` for audit.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterVerdict {
    Keep,
    Flag { warning: String, similarity: f64 },
    Discard { reason: String, similarity: f64 },
    Boost { delta: u8, similarity: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct FilterStats {
    pub kept: HashMap<EntityType, u32>,
    pub flagged: HashMap<EntityType, u32>,
    pub discarded: HashMap<EntityType, u32>,
    pub boosted: HashMap<EntityType, u32>,
}

impl FilterStats {
    fn record(&mut self, verdict: &FilterVerdict, entity_type: EntityType) {
        let bucket = match verdict {
            FilterVerdict::Keep => &mut self.kept,
            FilterVerdict::Flag { .. } => &mut self.flagged,
            FilterVerdict::Discard { .. } => &mut self.discarded,
            FilterVerdict::Boost { .. } => &mut self.boosted,
        };
        *bucket.entry(entity_type).or_insert(0) += 1;
    }
}

/// Pre-evaluation Taste Filter (spec §4.6). Reject-side is always checked
/// first ("safety over reward") before the accept side is consulted for a
/// Positive Echo boost.
pub struct TasteFilter {
    config: TasteFilterConfig,
}

impl TasteFilter {
    pub fn new(config: TasteFilterConfig) -> Self {
        Self { config }
    }

    /// Evaluate one mined item's text against the store and return a
    /// verdict. Also updates `stats` for observability (spec §4.6: "records
    /// per-entity-type counts").
    pub fn evaluate(
        &self,
        store: &FeedbackStore,
        text: &str,
        entity_type: EntityType,
        stats: &mut FilterStats,
    ) -> anyhow::Result<FilterVerdict> {
        let nearest_reject = store
            .query_similar(text, entity_type, Some(Verdict::Reject), 1)?
            .into_iter()
            .next();
        let s_r = nearest_reject.as_ref().map(|e| e.similarity).unwrap_or(0.0);

        let verdict = if s_r >= self.config.discard_threshold {
            let reason = nearest_reject
                .map(|e| e.reason_category)
                .unwrap_or_else(|| "similar to a rejected example".to_string());
            FilterVerdict::Discard { reason, similarity: s_r }
        } else if s_r >= self.config.flag_threshold {
            FilterVerdict::Flag {
                warning: format!("resembles a previously rejected example (similarity {s_r:.2})"),
                similarity: s_r,
            }
        } else {
            let nearest_accept = store
                .query_similar(text, entity_type, Some(Verdict::Accept), 1)?
                .into_iter()
                .next();
            let s_a = nearest_accept.map(|e| e.similarity).unwrap_or(0.0);
            if s_a >= self.config.boost_threshold {
                FilterVerdict::Boost {
                    delta: self.config.positive_echo_boost,
                    similarity: s_a,
                }
            } else {
                FilterVerdict::Keep
            }
        };

        stats.record(&verdict, entity_type);
        Ok(verdict)
    }
}

/// Apply a recommended boost to an importance score, capped at 10 (spec
/// §4.6). Returns `(new_importance, pre_boost_importance)`.
pub fn apply_boost(importance: u8, delta: u8) -> (u8, u8) {
    (importance.saturating_add(delta).min(10), importance)
}
