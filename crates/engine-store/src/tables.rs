use redb::TableDefinition;

// All tables key on a stable string id (usually a UUID's `to_string()`) and
// store a JSON-serialized value, matching the teacher's
// `memory::index` convention of `serde_json::to_vec`/`from_slice`
// rather than an actual binary codec (see DESIGN.md on the dropped `bincode`
// dependency).

pub const JOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs");
pub const JOB_RUNS: TableDefinition<&str, &[u8]> = TableDefinition::new("job_runs");
/// Secondary index: `job_id` -> newline-joined `run_id` list, in insertion
/// order, mirroring `memory::index`'s `tier_index` table.
pub const JOB_RUN_INDEX: TableDefinition<&str, &str> = TableDefinition::new("job_run_index");

pub const LLM_REQUESTS: TableDefinition<&str, &[u8]> = TableDefinition::new("llm_requests");
pub const LLM_RESPONSES: TableDefinition<&str, &[u8]> = TableDefinition::new("llm_responses");

pub const MINER_OUTPUTS: TableDefinition<&str, &[u8]> = TableDefinition::new("miner_outputs");
/// `source_id` -> newline-joined `segment_id` list, for per-episode scans.
pub const MINER_OUTPUT_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("miner_output_index");

pub const EVALUATED_CLAIMS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("evaluated_claims");
pub const EVALUATED_CLAIMS_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("evaluated_claims_index");

pub const QUESTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("questions");
pub const CLAIM_QUESTION_MAPPINGS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("claim_question_mappings");

pub const PENDING_FEEDBACK: TableDefinition<&str, &[u8]> =
    TableDefinition::new("pending_feedback");
