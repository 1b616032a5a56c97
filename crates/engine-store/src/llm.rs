use anyhow::Result;
use engine_core::{LlmRequestRecord, LlmResponseRecord, RunId};

use crate::store::Store;
use crate::tables;

impl Store {
    /// Persist a request/response pair tied to `run_id`, for audit, replay,
    /// and cost accounting (spec §3 LLMRequest/LLMResponse).
    pub fn record_llm_call(
        &self,
        request: LlmRequestRecord,
        response: LlmResponseRecord,
    ) -> Result<()> {
        debug_assert_eq!(request.request_id, response.request_id);
        self.put_json(
            tables::LLM_REQUESTS,
            &request.request_id.to_string(),
            &request,
        )?;
        self.put_json(
            tables::LLM_RESPONSES,
            &response.request_id.to_string(),
            &response,
        )?;
        Ok(())
    }

    pub fn list_llm_requests_for_run(&self, run_id: RunId) -> Result<Vec<LlmRequestRecord>> {
        let all: Vec<LlmRequestRecord> = self.scan_all(tables::LLM_REQUESTS)?;
        Ok(all.into_iter().filter(|r| r.run_id == run_id).collect())
    }
}
