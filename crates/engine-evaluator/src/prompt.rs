use serde_json::json;

use crate::candidate::ClaimCandidate;

const STATIC_INSTRUCTIONS: &str = "\
You score each candidate claim on three 0-10 integer scales: importance \
(impact on a sense-making reader), novelty (unlikeliness versus general \
knowledge), and confidence_final (strength of in-segment evidence and \
consistency with the other claims). Emit one evaluated_claims entry per \
input claim_index, echoing that index back, plus a canonical restatement, \
a decision of \"accept\" or \"reject\", and brief reasoning. Also emit a \
summary_assessment with key_themes across the accepted claims.";

/// Build the Flagship Evaluator prompt for one episode's candidate claim
/// set (spec §4.4). `content_summary` is a short human-written or
/// upstream-provided gist of the episode, required by `flagship_input.v1`.
pub fn build_evaluator_prompt(content_summary: &str, candidates: &[ClaimCandidate]) -> String {
    let claims_to_evaluate: Vec<_> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            json!({
                "claim_index": index,
                "claim_text": candidate.claim.claim_text,
                "claim_type": candidate.claim.claim_type,
                "stance": candidate.claim.stance,
                "context_quote": candidate.claim.context_quote,
                "timestamp": candidate.claim.timestamp,
            })
        })
        .collect();

    let input = json!({
        "content_summary": content_summary,
        "claims_to_evaluate": claims_to_evaluate,
    });

    format!(
        "{STATIC_INSTRUCTIONS}\n\nINPUT:\n{}",
        serde_json::to_string_pretty(&input).unwrap_or_default()
    )
}
