// Background job scheduler
//
// Runs one-shot jobs on the tokio runtime as soon as they are scheduled and
// reports failures on a channel. Success is only recorded in the job table.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::JobError;

/// Execution state of a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Scheduled,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Whether the run has not finished yet
    pub fn is_active(self) -> bool {
        matches!(self, JobState::Scheduled | JobState::Running)
    }
}

/// Job table entry
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub state: JobState,
    pub scheduled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    fn scheduled(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: JobState::Scheduled,
            scheduled_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    fn finish(&mut self, error: Option<String>) {
        self.state = if error.is_some() {
            JobState::Failed
        } else {
            JobState::Succeeded
        };
        self.finished_at = Some(Utc::now());
        self.error = error;
    }
}

/// Event published by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The job returned an error or panicked
    Failed { job_id: String, error: String },
}

/// One-shot job scheduler
pub struct JobScheduler {
    /// Job table, keyed by job id (thread-safe concurrent HashMap)
    jobs: Arc<DashMap<String, JobRecord>>,
    /// Sender side of the failure event stream
    events_tx: mpsc::UnboundedSender<JobEvent>,
}

impl JobScheduler {
    /// Create a scheduler and the receiver for its event stream
    ///
    /// There is exactly one receiver; whoever owns it is the sole listener.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            jobs: Arc::new(DashMap::new()),
            events_tx,
        };
        (scheduler, events_rx)
    }

    /// Schedule `job` to run immediately in the background
    ///
    /// Must be called from within a tokio runtime. Rejected while a previous
    /// run with the same id is still scheduled or running.
    pub fn schedule<F>(&self, job_id: impl Into<String>, job: F) -> Result<(), JobError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let job_id = job_id.into();

        match self.jobs.entry(job_id.clone()) {
            Entry::Occupied(entry) if entry.get().state.is_active() => {
                return Err(JobError::AlreadyScheduled(job_id));
            }
            Entry::Occupied(mut entry) => {
                entry.insert(JobRecord::scheduled(&job_id));
            }
            Entry::Vacant(entry) => {
                entry.insert(JobRecord::scheduled(&job_id));
            }
        }

        debug!(job_id = %job_id, "Job scheduled");

        let jobs = Arc::clone(&self.jobs);
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            set_state(&jobs, &job_id, JobState::Running);
            info!(job_id = %job_id, "Job started");

            let result = match AssertUnwindSafe(job).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(anyhow::anyhow!("job panicked: {}", panic_message(&*panic))),
            };

            match result {
                Ok(()) => {
                    if let Some(mut record) = jobs.get_mut(&job_id) {
                        record.finish(None);
                    }
                    info!(job_id = %job_id, "Job succeeded");
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    if let Some(mut record) = jobs.get_mut(&job_id) {
                        record.finish(Some(error.clone()));
                    }
                    warn!(job_id = %job_id, error = %error, "Job failed");

                    if events_tx.send(JobEvent::Failed { job_id, error }).is_err() {
                        warn!("No listener for job failure events");
                    }
                }
            }
        });

        Ok(())
    }

    /// Snapshot of one job record
    pub fn job(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every job record, sorted by schedule time
    pub fn jobs(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self
            .jobs
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.scheduled_at);
        records
    }

    /// Number of jobs currently scheduled or running
    pub fn active_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|entry| entry.value().state.is_active())
            .count()
    }
}

fn set_state(jobs: &DashMap<String, JobRecord>, job_id: &str, state: JobState) {
    if let Some(mut record) = jobs.get_mut(job_id) {
        record.state = state;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
