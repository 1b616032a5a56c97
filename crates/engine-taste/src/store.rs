use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use engine_core::{EntityType, FeedbackExample, FeedbackId, Verdict};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::embedder::{similarity, Embedder};
use crate::golden;
use crate::reasons::ReasonsTaxonomy;

/// `entry_id (str) -> serde_json(StoredExample)`, grounded directly on the
/// teacher's `index::MemoryIndex` `ENTRIES_TABLE` pattern (a single redb
/// table of compact rows keyed by UUID string).
const ENTRIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");
/// Single-row bookkeeping table: `"golden_version" -> schema_version string`.
const META_TABLE: TableDefinition<&str, &str> = TableDefinition::new("meta");

const GOLDEN_VERSION_KEY: &str = "golden_version";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredExample {
    id: FeedbackId,
    entity_type: EntityType,
    entity_text: String,
    verdict: Verdict,
    reason_category: String,
    user_notes: String,
    source_id: String,
    is_golden: bool,
    created_at: DateTime<Utc>,
    embedding: Vec<f32>,
}

/// One nearest-neighbor hit, as returned by `query_similar` (spec §4.6).
#[derive(Debug, Clone)]
pub struct SimilarExample {
    pub id: FeedbackId,
    pub entity_text: String,
    pub reason_category: String,
    pub verdict: Verdict,
    pub is_golden: bool,
    pub similarity: f64,
}

/// Vector-feedback store backing the Taste Engine (spec §4.6 C6). Keeps the
/// teacher's pattern of a flat append-only store plus an explicit
/// brute-force similarity scan rather than an external vector database —
/// correct at this store's scale (thousands, not millions, of examples).
pub struct FeedbackStore {
    db: Database,
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    reasons: ReasonsTaxonomy,
}

impl FeedbackStore {
    /// Open or create the store at `path`. Backs up the existing file (if
    /// any) under a sibling `backups/` directory before touching it, then
    /// reconciles the bundled golden set against the stored version marker.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>, backup_count: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        crate::backup::backup_and_rotate(&path, backup_count, Utc::now())
            .context("backing up taste-engine store before open")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path)
            .with_context(|| format!("opening taste-engine store at {}", path.display()))?;
        {
            let txn = db.begin_write()?;
            txn.open_table(ENTRIES_TABLE)?;
            txn.open_table(META_TABLE)?;
            txn.commit()?;
        }

        let reasons = ReasonsTaxonomy::load_bundled().context("loading bundled reasons taxonomy")?;
        let store = Self { db, path, embedder, reasons };
        store.reconcile_golden_set()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reconcile_golden_set(&self) -> Result<()> {
        let golden = golden::load_bundled()?;
        let stored_version = self.read_meta(GOLDEN_VERSION_KEY)?;

        if stored_version.as_deref() == Some(golden.schema_version.as_str()) {
            return Ok(());
        }

        self.delete_golden_rows()?;
        for example in golden.examples {
            let feedback = FeedbackExample {
                id: FeedbackId::new(),
                entity_type: example.entity_type,
                entity_text: example.entity_text,
                verdict: example.verdict,
                reason_category: example.reason_category,
                user_notes: String::new(),
                source_id: "golden_set".to_string(),
                is_golden: true,
                created_at: Utc::now(),
            };
            self.insert_row(feedback)?;
        }
        self.write_meta(GOLDEN_VERSION_KEY, &golden.schema_version)?;
        tracing::info!(version = %golden.schema_version, "taste-engine golden set (re)ingested");
        Ok(())
    }

    fn delete_golden_rows(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ENTRIES_TABLE)?;
            let golden_ids: Vec<String> = table
                .iter()?
                .filter_map(|row| {
                    let (key, value) = row.ok()?;
                    let stored: StoredExample = serde_json::from_slice(value.value()).ok()?;
                    stored.is_golden.then(|| key.value().to_string())
                })
                .collect();
            for id in golden_ids {
                table.remove(id.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn read_meta(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(META_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    fn write_meta(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(META_TABLE)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn insert_row(&self, example: FeedbackExample) -> Result<()> {
        let embedding = self.embedder.embed(&example.entity_text);
        let stored = StoredExample {
            id: example.id,
            entity_type: example.entity_type,
            entity_text: example.entity_text,
            verdict: example.verdict,
            reason_category: example.reason_category,
            user_notes: example.user_notes,
            source_id: example.source_id,
            is_golden: example.is_golden,
            created_at: example.created_at,
            embedding,
        };
        let bytes = serde_json::to_vec(&stored)?;
        let key = stored.id.to_string();

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ENTRIES_TABLE)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Append one user or golden example. Does not dedup — callers that need
    /// "insert only if new" should check [`Self::has_example`] first (the
    /// Feedback Worker does, per spec §4.7). Non-golden examples have their
    /// `reason_category` rewritten to [`crate::OTHER_REASON`] when it isn't
    /// a recognized taxonomy key (spec §4.6); golden examples bypass this,
    /// per `ReasonsTaxonomy::normalize`'s own contract.
    pub fn add_feedback(&self, mut example: FeedbackExample) -> Result<()> {
        if !example.is_golden {
            example.reason_category = self.reasons.normalize(&example.reason_category);
        }
        self.insert_row(example)
    }

    fn scan(&self) -> Result<Vec<StoredExample>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES_TABLE)?;
        let mut rows = Vec::new();
        for row in table.iter()? {
            let (_, value) = row?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    /// True when an identical `(entity_text, entity_type, verdict)` triple
    /// already exists, so the Feedback Worker can skip re-ingesting
    /// (spec §4.6 "Deduplication").
    pub fn has_example(&self, text: &str, entity_type: EntityType, verdict: Verdict) -> Result<bool> {
        let rows = self.scan()?;
        Ok(rows
            .iter()
            .any(|row| row.entity_type == entity_type && row.verdict == verdict && row.entity_text == text))
    }

    /// Semantic nearest-neighbor over the subset matching `entity_type` and,
    /// when given, `verdict` — brute-force scan scored by `s = 1/(1+L2)`,
    /// sorted descending, truncated to `n` (spec §4.6, ported from
    /// `taste_engine.py::query_similar`).
    pub fn query_similar(
        &self,
        text: &str,
        entity_type: EntityType,
        verdict: Option<Verdict>,
        n: usize,
    ) -> Result<Vec<SimilarExample>> {
        let query_embedding = self.embedder.embed(text);
        let mut rows = self.scan()?;
        rows.retain(|row| row.entity_type == entity_type && verdict.map(|v| v == row.verdict).unwrap_or(true));

        let mut scored: Vec<SimilarExample> = rows
            .into_iter()
            .map(|row| {
                let s = similarity(&query_embedding, &row.embedding);
                SimilarExample {
                    id: row.id,
                    entity_text: row.entity_text,
                    reason_category: row.reason_category,
                    verdict: row.verdict,
                    is_golden: row.is_golden,
                    similarity: s,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n);
        Ok(scored)
    }

    /// The verdict of the single nearest example to `text` within
    /// `entity_type`, across both accept and reject rows. Used by the
    /// pre-evaluation Taste Filter (spec §4.6 query #2); `None` when the
    /// store has no rows for this entity type yet.
    pub fn check(&self, text: &str, entity_type: EntityType) -> Result<Option<Verdict>> {
        let nearest = self.query_similar(text, entity_type, None, 1)?;
        Ok(nearest.into_iter().next().map(|e| e.verdict))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.scan()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;

    fn open_store(dir: &tempfile::TempDir) -> FeedbackStore {
        FeedbackStore::open(dir.path().join("taste.redb"), Arc::new(HashingEmbedder::default()), 5).unwrap()
    }

    fn example(text: &str, verdict: Verdict, reason: &str) -> FeedbackExample {
        FeedbackExample {
            id: FeedbackId::new(),
            entity_type: EntityType::Claim,
            entity_text: text.to_string(),
            verdict,
            reason_category: reason.to_string(),
            user_notes: String::new(),
            source_id: "episode-1".to_string(),
            is_golden: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn opening_ingests_the_golden_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(!store.is_empty().unwrap());
    }

    #[test]
    fn reopening_does_not_duplicate_the_golden_set() {
        let dir = tempfile::tempdir().unwrap();
        let count_after_first_open = {
            let store = open_store(&dir);
            store.len().unwrap()
        };
        let count_after_second_open = {
            let store = open_store(&dir);
            store.len().unwrap()
        };
        assert_eq!(count_after_first_open, count_after_second_open);
    }

    #[test]
    fn has_example_detects_exact_triples() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let ex = example("a brand new claim text", Verdict::Accept, "high_signal");
        assert!(!store.has_example(&ex.entity_text, EntityType::Claim, Verdict::Accept).unwrap());
        store.add_feedback(ex.clone()).unwrap();
        assert!(store.has_example(&ex.entity_text, EntityType::Claim, Verdict::Accept).unwrap());
    }

    #[test]
    fn unrecognized_reason_category_is_rewritten_to_other() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let ex = example("a brand new claim text", Verdict::Reject, "not_a_real_reason");
        store.add_feedback(ex.clone()).unwrap();

        let hits = store.query_similar(&ex.entity_text, EntityType::Claim, Some(Verdict::Reject), 1).unwrap();
        assert_eq!(hits[0].reason_category, crate::OTHER_REASON);
    }

    #[test]
    fn query_similar_ranks_the_closer_text_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store
            .add_feedback(example("the federal funds rate influences mortgage pricing", Verdict::Accept, "high_signal"))
            .unwrap();
        store
            .add_feedback(example("bananas are a good source of potassium", Verdict::Accept, "high_signal"))
            .unwrap();

        let hits = store
            .query_similar("fed rate changes feed through to mortgage rates", EntityType::Claim, Some(Verdict::Accept), 5)
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits[0].entity_text.contains("mortgage"));
    }
}
