use engine_core::{ClaimId, MinedClaim, MinerOutput};

/// One claim awaiting evaluation, tied to the stable id it will carry
/// forward as an `EvaluatedClaim` (spec §4.4: "take the union of all
/// MinerOutput claims").
#[derive(Debug, Clone)]
pub struct ClaimCandidate {
    pub claim_id: ClaimId,
    pub claim: MinedClaim,
}

/// Flatten every `MinerOutput.claims` across an episode's segments into the
/// evaluator's input set, minting a fresh `ClaimId` per claim.
pub fn collect_candidates(outputs: &[MinerOutput]) -> Vec<ClaimCandidate> {
    outputs
        .iter()
        .flat_map(|output| output.claims.iter())
        .map(|claim| ClaimCandidate {
            claim_id: ClaimId::new(),
            claim: claim.clone(),
        })
        .collect()
}
