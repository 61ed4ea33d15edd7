// Training orchestration
//
// Reserves a model name, schedules the training job, and removes the
// reservation again when the job fails.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::TrainingError;
use crate::jobs::{JobEvent, JobScheduler};
use crate::models::{validate_model_name, ModelStore};

/// Iterations used when a request does not specify any
pub const DEFAULT_ITERATIONS: u32 = 150;

/// Prefix of every training job id
const JOB_PREFIX: &str = "train_";

/// External training collaborator
///
/// On success the trainer must leave at least one artifact in the model's
/// directory; that is what marks the model as ready.
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn train(&self, model_name: &str, iterations: u32) -> Result<()>;
}

/// Job id used for a model's training run
pub fn training_job_id(model_name: &str) -> String {
    format!("{}{}", JOB_PREFIX, model_name)
}

/// Model name encoded in a training job id, if it is one
pub fn model_name_from_job_id(job_id: &str) -> Option<&str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^train_(.+)$").expect("training job id pattern is valid")
    });

    pattern
        .captures(job_id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Starts training runs
pub struct TrainingOrchestrator {
    store: Arc<ModelStore>,
    scheduler: Arc<JobScheduler>,
    trainer: Arc<dyn Trainer>,
}

impl TrainingOrchestrator {
    pub fn new(
        store: Arc<ModelStore>,
        scheduler: Arc<JobScheduler>,
        trainer: Arc<dyn Trainer>,
    ) -> Self {
        Self {
            store,
            scheduler,
            trainer,
        }
    }

    /// Reserve `model_name` and schedule its training job
    ///
    /// Returns once the job is scheduled; training runs in the background.
    /// The reservation is visible on disk before the job is scheduled, so a
    /// concurrent request for the same name fails with `AlreadyExists`.
    pub fn start_training(&self, model_name: &str, iterations: u32) -> Result<(), TrainingError> {
        validate_model_name(model_name)?;
        if iterations == 0 {
            return Err(TrainingError::InvalidIterations(0));
        }

        self.store.reserve(model_name)?;

        let job_id = training_job_id(model_name);
        let trainer = Arc::clone(&self.trainer);
        let name = model_name.to_string();

        let scheduled = self.scheduler.schedule(job_id.clone(), async move {
            trainer.train(&name, iterations).await
        });

        if let Err(e) = scheduled {
            // Keep the name trainable if the job never got queued
            if let Err(release_err) = self.store.release(model_name) {
                error!(model = %model_name, error = %release_err, "Failed to release reservation");
            }
            return Err(e.into());
        }

        info!(model = %model_name, iterations, job_id = %job_id, "Training scheduled");
        Ok(())
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }
}

/// Spawn the process-wide listener that cleans up after failed jobs
///
/// Call once at startup with the scheduler's event receiver. Runs until
/// the scheduler is dropped.
pub fn spawn_failure_listener(
    store: Arc<ModelStore>,
    mut events: mpsc::UnboundedReceiver<JobEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Training failure listener started");

        while let Some(event) = events.recv().await {
            match event {
                JobEvent::Failed { job_id, error } => {
                    let Some(model_name) = model_name_from_job_id(&job_id) else {
                        debug!(job_id = %job_id, "Ignoring failure of non-training job");
                        continue;
                    };

                    warn!(model = %model_name, error = %error, "Training failed, releasing model");
                    if let Err(e) = store.release(model_name) {
                        error!(model = %model_name, error = %e, "Failed to release model directory");
                    }
                }
            }
        }

        debug!("Training failure listener stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Records calls and optionally fails
    struct RecordingTrainer {
        calls: Mutex<Vec<(String, u32)>>,
        fail: bool,
    }

    impl RecordingTrainer {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl Trainer for RecordingTrainer {
        async fn train(&self, model_name: &str, iterations: u32) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((model_name.to_string(), iterations));
            if self.fail {
                anyhow::bail!("diverged");
            }
            Ok(())
        }
    }

    fn setup(trainer: Arc<RecordingTrainer>) -> (TempDir, TrainingOrchestrator) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ModelStore::open(dir.path()).unwrap());
        let (scheduler, events) = JobScheduler::new();
        spawn_failure_listener(Arc::clone(&store), events);
        let orchestrator = TrainingOrchestrator::new(store, Arc::new(scheduler), trainer);
        (dir, orchestrator)
    }

    #[test]
    fn test_job_id_round_trip() {
        assert_eq!(training_job_id("alpha"), "train_alpha");
        assert_eq!(model_name_from_job_id("train_alpha"), Some("alpha"));
        assert_eq!(model_name_from_job_id("train_train_x"), Some("train_x"));
        assert_eq!(model_name_from_job_id("train_"), None);
        assert_eq!(model_name_from_job_id("cleanup_alpha"), None);
    }

    #[tokio::test]
    async fn test_start_training_reserves_and_runs() {
        let trainer = RecordingTrainer::new(false);
        let (dir, orchestrator) = setup(Arc::clone(&trainer));

        orchestrator.start_training("alpha", 7).unwrap();
        assert!(dir.path().join("alpha").is_dir());

        tokio::time::timeout(Duration::from_secs(5), async {
            while trainer.calls.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(*trainer.calls.lock().unwrap(), vec![("alpha".to_string(), 7)]);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected_without_scheduling() {
        let trainer = RecordingTrainer::new(false);
        let (_dir, orchestrator) = setup(trainer);

        orchestrator.start_training("beta", DEFAULT_ITERATIONS).unwrap();
        let err = orchestrator
            .start_training("beta", DEFAULT_ITERATIONS)
            .unwrap_err();
        assert_eq!(err.to_string(), "modelName beta already exists.");
        assert_eq!(orchestrator.scheduler().jobs().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_iterations_rejected_before_reserving() {
        let (dir, orchestrator) = setup(RecordingTrainer::new(false));
        let err = orchestrator.start_training("gamma", 0).unwrap_err();
        assert!(matches!(err, TrainingError::InvalidIterations(0)));
        assert!(!dir.path().join("gamma").exists());
    }

    #[tokio::test]
    async fn test_failed_training_releases_model() {
        let (dir, orchestrator) = setup(RecordingTrainer::new(true));

        orchestrator.start_training("delta", 3).unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while dir.path().join("delta").exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("failed model directory was not removed");

        // Name is trainable again
        orchestrator.start_training("delta", 3).unwrap();
    }

    #[tokio::test]
    async fn test_listener_ignores_foreign_jobs() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ModelStore::open(dir.path()).unwrap());
        store.reserve("keep").unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let listener = spawn_failure_listener(Arc::clone(&store), rx);
        tx.send(JobEvent::Failed {
            job_id: "reindex_keep".to_string(),
            error: "unrelated".to_string(),
        })
        .unwrap();
        drop(tx);

        listener.await.unwrap();
        assert!(dir.path().join("keep").is_dir());
    }
}
