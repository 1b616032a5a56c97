use std::path::Path;

use anyhow::{Context, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};

use crate::tables;

/// The durable relational store backing Jobs, JobRuns, LLM audit records,
/// mined/evaluated claims, questions, and the pending-feedback queue (spec
/// §1 C1, §6 "Persistent state layout").
///
/// Backed by `redb`: a single-file, copy-on-write, ACID store. `spec.md`'s
/// "write-ahead logging and enforced foreign keys" requirement is met by
/// redb's durable commit mode plus application-level FK checks performed
/// inside the same write transaction as the dependent insert — see
/// [`crate::job::Store::start_run`] for the canonical example. Grounded on
/// the `memory` crate's `index::MemoryIndex`, which uses the same engine for a
/// smaller single-table index.
pub struct Store {
    pub(crate) db: Database,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref())
            .with_context(|| format!("opening store at {}", path.as_ref().display()))?;
        let store = Self { db };
        store.init_tables()?;
        Ok(store)
    }

    /// In-memory store for tests — avoids a tempdir per test.
    #[cfg(any(test, feature = "test-util"))]
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db };
        store.init_tables()?;
        Ok(store)
    }

    /// Opening every table at least once inside a committed write
    /// transaction creates it if absent — redb requires this before any
    /// read transaction can see it.
    fn init_tables(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            txn.open_table(tables::JOBS)?;
            txn.open_table(tables::JOB_RUNS)?;
            txn.open_table(tables::JOB_RUN_INDEX)?;
            txn.open_table(tables::LLM_REQUESTS)?;
            txn.open_table(tables::LLM_RESPONSES)?;
            txn.open_table(tables::MINER_OUTPUTS)?;
            txn.open_table(tables::MINER_OUTPUT_INDEX)?;
            txn.open_table(tables::EVALUATED_CLAIMS)?;
            txn.open_table(tables::EVALUATED_CLAIMS_INDEX)?;
            txn.open_table(tables::QUESTIONS)?;
            txn.open_table(tables::CLAIM_QUESTION_MAPPINGS)?;
            txn.open_table(tables::PENDING_FEEDBACK)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub(crate) fn put_json<V: Serialize>(
        &self,
        table_def: TableDefinition<&str, &[u8]>,
        key: &str,
        value: &V,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(table_def)?;
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub(crate) fn get_json<V: DeserializeOwned>(
        &self,
        table_def: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> Result<Option<V>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table_def)?;
        match table.get(key)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub(crate) fn scan_all<V: DeserializeOwned>(
        &self,
        table_def: TableDefinition<&str, &[u8]>,
    ) -> Result<Vec<V>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table_def)?;
        let mut out = Vec::new();
        for row in table.iter()? {
            let (_, guard) = row?;
            out.push(serde_json::from_slice(guard.value())?);
        }
        Ok(out)
    }

    /// Append `id` to a newline-joined index row, or create it with a single
    /// entry if absent. Used for the `job_id -> run_ids` and similar
    /// one-to-many secondary indices (mirrors the `memory` crate's
    /// `index`'s `tier_index` table).
    pub(crate) fn append_index(
        &self,
        table_def: TableDefinition<&str, &str>,
        key: &str,
        id: &str,
    ) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(table_def)?;
            let existing = table.get(key)?.map(|g| g.value().to_string());
            let updated = match existing {
                Some(s) if !s.is_empty() => format!("{s}\n{id}"),
                _ => id.to_string(),
            };
            table.insert(key, updated.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub(crate) fn read_index(
        &self,
        table_def: TableDefinition<&str, &str>,
        key: &str,
    ) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table_def)?;
        Ok(match table.get(key)? {
            Some(guard) => guard
                .value()
                .split('\n')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
            None => vec![],
        })
    }
}
