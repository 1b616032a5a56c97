/// A single accept/reject exemplar spliced into the miner's reserved
/// few-shot block (spec §4.3). `similarity` is the Taste Engine's `1/(1+d)`
/// score; callers sort by it so the reserved block renders deterministically
/// for identical nearest-neighbor sets, preserving prompt-cache reuse.
#[derive(Debug, Clone)]
pub struct FewShotExample {
    pub entity_text: String,
    pub reason_category: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Default)]
pub struct FewShotBundle {
    pub accept: Vec<FewShotExample>,
    pub reject: Vec<FewShotExample>,
}

/// Boundary the Miner queries for few-shot exemplars. Kept trait-only here so
/// `engine-miner` never depends on `engine-taste` directly — the concrete
/// implementation is wired in by the orchestrator (spec §9 "no module-level
/// statics"; dependencies are passed in, not reached for).
pub trait FewShotSource: Send + Sync {
    fn query_similar(&self, segment_text: &str, k: usize) -> FewShotBundle;
}

/// Used when no Taste Engine is configured (e.g. cold start before any
/// feedback exists) — an empty reserved block, not an error.
pub struct NoFewShot;

impl FewShotSource for NoFewShot {
    fn query_similar(&self, _segment_text: &str, _k: usize) -> FewShotBundle {
        FewShotBundle::default()
    }
}
