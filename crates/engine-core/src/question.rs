use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClaimId, QuestionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Factual,
    Causal,
    Normative,
    Comparative,
    Procedural,
    Forecasting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question_id: QuestionId,
    pub question_text: String,
    pub question_type: QuestionType,
    pub domain: String,
    pub importance_score: f64,
    /// Engine proposes; a human reviews via this flag (joint ownership,
    /// spec §3 "Ownership summary").
    pub reviewed: bool,
    pub created_at: DateTime<Utc>,
    /// Set when this question was merged away into another and should no
    /// longer be surfaced, but is kept for audit (spec §4.8 merge policy).
    #[serde(default)]
    pub deprecated_into: Option<QuestionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Answers,
    PartialAnswer,
    SupportsAnswer,
    Contradicts,
    Prerequisite,
    FollowUp,
    Context,
}

/// `(claim_id, question_id)` is unique once persisted (spec §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimQuestionMapping {
    pub claim_id: ClaimId,
    pub question_id: QuestionId,
    pub relation_type: RelationType,
    pub relevance_score: f64,
}
