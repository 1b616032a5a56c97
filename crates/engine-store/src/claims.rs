use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use engine_core::{ClaimId, EngineError, EvaluatedClaim, MinerOutput, SegmentId, SourceId};
use serde::{Deserialize, Serialize};

use crate::store::Store;
use crate::tables;

/// Store-owned wrapper around [`EvaluatedClaim`] carrying the episode it
/// belongs to and the `updated_at` stamp optimistic-concurrency edits key
/// off of (spec §3 "Review edits").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatedClaimRow {
    pub source_id: SourceId,
    pub claim: EvaluatedClaim,
    pub updated_at: DateTime<Utc>,
}

fn miner_output_key(source_id: &SourceId, segment_id: &SegmentId) -> String {
    format!("{source_id}:{segment_id}")
}

impl Store {
    /// Written once per run (spec §3 ownership summary) — a re-mine replaces
    /// only the segments it targeted, by writing over the same key.
    pub fn put_miner_output(&self, source_id: &SourceId, output: MinerOutput) -> Result<()> {
        let key = miner_output_key(source_id, &output.segment_id);
        self.put_json(tables::MINER_OUTPUTS, &key, &output)?;
        self.append_index(
            tables::MINER_OUTPUT_INDEX,
            &source_id.to_string(),
            &output.segment_id.to_string(),
        )?;
        Ok(())
    }

    pub fn get_miner_output(
        &self,
        source_id: &SourceId,
        segment_id: &SegmentId,
    ) -> Result<Option<MinerOutput>> {
        self.get_json(tables::MINER_OUTPUTS, &miner_output_key(source_id, segment_id))
    }

    /// All `MinerOutput`s for an episode, deterministically ordered by
    /// `segment_id` (spec §5 ordering guarantee: aggregated sorted by
    /// `(segment_id)` before evaluation).
    pub fn list_miner_outputs(&self, source_id: &SourceId) -> Result<Vec<MinerOutput>> {
        let segment_ids = self.read_index(tables::MINER_OUTPUT_INDEX, &source_id.to_string())?;
        let mut seen = std::collections::HashSet::new();
        let mut outputs = Vec::new();
        for raw_segment_id in segment_ids {
            if !seen.insert(raw_segment_id.clone()) {
                continue;
            }
            let segment_id: SegmentId = raw_segment_id.into();
            if let Some(output) =
                self.get_json(tables::MINER_OUTPUTS, &miner_output_key(source_id, &segment_id))?
            {
                outputs.push(output);
            }
        }
        outputs.sort_by(|a: &MinerOutput, b: &MinerOutput| a.segment_id.cmp(&b.segment_id));
        Ok(outputs)
    }

    pub fn put_evaluated_claims(
        &self,
        source_id: &SourceId,
        claims: Vec<EvaluatedClaim>,
    ) -> Result<()> {
        let now = Utc::now();
        for claim in claims {
            let row = EvaluatedClaimRow {
                source_id: source_id.clone(),
                claim,
                updated_at: now,
            };
            self.put_json(
                tables::EVALUATED_CLAIMS,
                &row.claim.claim_id.to_string(),
                &row,
            )?;
            self.append_index(
                tables::EVALUATED_CLAIMS_INDEX,
                &source_id.to_string(),
                &row.claim.claim_id.to_string(),
            )?;
        }
        Ok(())
    }

    pub fn get_evaluated_claim(&self, claim_id: ClaimId) -> Result<Option<EvaluatedClaimRow>> {
        self.get_json(tables::EVALUATED_CLAIMS, &claim_id.to_string())
    }

    pub fn list_evaluated_claims(&self, source_id: &SourceId) -> Result<Vec<EvaluatedClaimRow>> {
        let ids = self.read_index(tables::EVALUATED_CLAIMS_INDEX, &source_id.to_string())?;
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = self.get_json(tables::EVALUATED_CLAIMS, &id)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Apply `mutate` to the `EvaluatedClaim` identified by `claim_id`,
    /// provided `expected_updated_at` matches the row currently stored.
    /// Returns [`EngineError::ConcurrentModification`] on a stale stamp —
    /// the Review UI's only defense against stomping a concurrent edit
    /// (spec §3, §7).
    pub fn update_evaluated_claim_with_version(
        &self,
        claim_id: ClaimId,
        expected_updated_at: DateTime<Utc>,
        mutate: impl FnOnce(&mut EvaluatedClaim),
    ) -> Result<EvaluatedClaimRow> {
        let mut row: EvaluatedClaimRow = self
            .get_json(tables::EVALUATED_CLAIMS, &claim_id.to_string())?
            .with_context(|| format!("no such evaluated claim {claim_id}"))?;

        if row.updated_at != expected_updated_at {
            return Err(EngineError::ConcurrentModification {
                expected: expected_updated_at,
                found: row.updated_at,
            }
            .into());
        }

        mutate(&mut row.claim);
        row.updated_at = Utc::now();
        self.put_json(tables::EVALUATED_CLAIMS, &claim_id.to_string(), &row)?;
        Ok(row)
    }
}
