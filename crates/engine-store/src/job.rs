use anyhow::{Result, bail};
use chrono::Utc;
use engine_core::{Job, JobId, JobRun, JobType, RunId, RunMetrics, RunStatus};
use redb::ReadableTable;
use tracing::{info, warn};

use crate::store::Store;
use crate::tables;

impl Store {
    pub fn create_job(
        &self,
        job_type: JobType,
        input_id: impl Into<String>,
        config_json: serde_json::Value,
        auto_process: bool,
    ) -> Result<Job> {
        let now = Utc::now();
        let job = Job {
            job_id: JobId::new(),
            job_type,
            input_id: input_id.into(),
            config_json,
            auto_process,
            created_at: now,
            updated_at: now,
        };
        self.put_json(tables::JOBS, &job.job_id.to_string(), &job)?;
        info!(job_id = %job.job_id, job_type = ?job.job_type, "job created");
        Ok(job)
    }

    pub fn get_job(&self, job_id: JobId) -> Result<Option<Job>> {
        self.get_json(tables::JOBS, &job_id.to_string())
    }

    /// Start a new run for `job_id`.
    ///
    /// Enforces three spec §3 invariants in a single write transaction: the
    /// job must exist (foreign key), no other run for this job may already
    /// be `running`, and `attempt_number` is the next value in the dense
    /// 1..k sequence for this job.
    pub fn start_run(&self, job_id: JobId) -> Result<JobRun> {
        let existing_run_ids = self.read_index(tables::JOB_RUN_INDEX, &job_id.to_string())?;
        let mut existing_runs = Vec::with_capacity(existing_run_ids.len());
        for run_id in &existing_run_ids {
            if let Some(run) = self.get_json::<JobRun>(tables::JOB_RUNS, run_id)? {
                existing_runs.push(run);
            }
        }

        let txn = self.db.begin_write()?;
        {
            let jobs = txn.open_table(tables::JOBS)?;
            if jobs.get(job_id.to_string().as_str())?.is_none() {
                bail!("start_run: no such job {job_id}");
            }
        }

        if let Some(running) = existing_runs.iter().find(|r| r.status == RunStatus::Running) {
            bail!(
                "start_run: job {job_id} already has a running run {}",
                running.run_id
            );
        }

        let attempt_number = existing_runs.len() as u32 + 1;
        let run = JobRun::new_queued(job_id, attempt_number);
        let mut run = run;
        run.status = RunStatus::Running;

        {
            let mut runs_table = txn.open_table(tables::JOB_RUNS)?;
            let bytes = serde_json::to_vec(&run)?;
            runs_table.insert(run.run_id.to_string().as_str(), bytes.as_slice())?;

            let mut index_table = txn.open_table(tables::JOB_RUN_INDEX)?;
            let existing = index_table
                .get(job_id.to_string().as_str())?
                .map(|g| g.value().to_string());
            let updated = match existing {
                Some(s) if !s.is_empty() => format!("{s}\n{}", run.run_id),
                _ => run.run_id.to_string(),
            };
            index_table.insert(job_id.to_string().as_str(), updated.as_str())?;
        }
        txn.commit()?;

        info!(job_id = %job_id, run_id = %run.run_id, attempt_number, "run started");
        Ok(run)
    }

    pub fn checkpoint(&self, run_id: RunId, cursor: serde_json::Value) -> Result<()> {
        self.mutate_run(run_id, |run| {
            run.checkpoint_json = cursor;
            Ok(())
        })
    }

    pub fn complete_run(&self, run_id: RunId, metrics: RunMetrics) -> Result<()> {
        self.mutate_run(run_id, |run| {
            if run.status.is_terminal() {
                bail!("complete_run: run {run_id} already in terminal state {:?}", run.status);
            }
            run.status = RunStatus::Succeeded;
            run.metrics = metrics;
            run.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    pub fn fail_run(&self, run_id: RunId, error: impl Into<String>) -> Result<()> {
        let error = error.into();
        self.mutate_run(run_id, |run| {
            if run.status.is_terminal() {
                bail!("fail_run: run {run_id} already in terminal state {:?}", run.status);
            }
            run.status = RunStatus::Failed;
            run.error = Some(error.clone());
            run.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    pub fn cancel_run(&self, run_id: RunId) -> Result<()> {
        self.mutate_run(run_id, |run| {
            if run.status.is_terminal() {
                bail!("cancel_run: run {run_id} already in terminal state {:?}", run.status);
            }
            run.status = RunStatus::Cancelled;
            run.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    pub fn get_run(&self, run_id: RunId) -> Result<Option<JobRun>> {
        self.get_json(tables::JOB_RUNS, &run_id.to_string())
    }

    pub fn list_runs(&self, job_id: JobId) -> Result<Vec<JobRun>> {
        let ids = self.read_index(tables::JOB_RUN_INDEX, &job_id.to_string())?;
        let mut runs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(run) = self.get_json(tables::JOB_RUNS, &id)? {
                runs.push(run);
            }
        }
        Ok(runs)
    }

    fn mutate_run(&self, run_id: RunId, f: impl FnOnce(&mut JobRun) -> Result<()>) -> Result<()> {
        let mut run: JobRun = self
            .get_json(tables::JOB_RUNS, &run_id.to_string())?
            .ok_or_else(|| anyhow::anyhow!("no such run {run_id}"))?;
        f(&mut run)?;
        run.updated_at = Utc::now();
        self.put_json(tables::JOB_RUNS, &run_id.to_string(), &run)
    }

    /// Sweep runs stuck in `running` whose `started_at` exceeds
    /// `heartbeat_threshold_secs`, transitioning them to `failed` (spec §4.1
    /// failure semantics: a crashed process leaves a run `running` until a
    /// reaper sweeps it). All LLMRequest/Response rows for the failed run
    /// remain untouched for replay. Returns the number of runs reaped.
    pub fn reap_stale_runs(&self, heartbeat_threshold_secs: i64) -> Result<usize> {
        let all_jobs: Vec<Job> = self.scan_all(tables::JOBS)?;
        let mut reaped = 0;
        let now = Utc::now();

        for job in all_jobs {
            for run in self.list_runs(job.job_id)? {
                if run.status != RunStatus::Running {
                    continue;
                }
                let age = now.signed_duration_since(run.started_at).num_seconds();
                if age > heartbeat_threshold_secs {
                    warn!(run_id = %run.run_id, age_secs = age, "reaping stale run");
                    self.fail_run(run.run_id, "reaped: heartbeat threshold exceeded")?;
                    reaped += 1;
                }
            }
        }
        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::JobType;

    #[test]
    fn only_one_running_run_per_job() {
        let store = Store::open_in_memory().unwrap();
        let job = store
            .create_job(JobType::Mine, "ep1", serde_json::json!({}), false)
            .unwrap();
        let run1 = store.start_run(job.job_id).unwrap();
        assert!(store.start_run(job.job_id).is_err());
        store.complete_run(run1.run_id, RunMetrics::default()).unwrap();
        let run2 = store.start_run(job.job_id).unwrap();
        assert_eq!(run2.attempt_number, 2);
    }

    #[test]
    fn attempt_numbers_are_dense() {
        let store = Store::open_in_memory().unwrap();
        let job = store
            .create_job(JobType::Mine, "ep1", serde_json::json!({}), false)
            .unwrap();
        for expected in 1..=3u32 {
            let run = store.start_run(job.job_id).unwrap();
            assert_eq!(run.attempt_number, expected);
            store.fail_run(run.run_id, "boom").unwrap();
        }
    }

    #[test]
    fn start_run_rejects_unknown_job() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.start_run(JobId::new()).is_err());
    }

    #[test]
    fn terminal_states_never_transition_back() {
        let store = Store::open_in_memory().unwrap();
        let job = store
            .create_job(JobType::Mine, "ep1", serde_json::json!({}), false)
            .unwrap();
        let run = store.start_run(job.job_id).unwrap();
        store.complete_run(run.run_id, RunMetrics::default()).unwrap();
        assert!(store.fail_run(run.run_id, "too late").is_err());
        assert!(store.cancel_run(run.run_id).is_err());
    }
}
