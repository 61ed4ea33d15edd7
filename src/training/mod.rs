// Training module
// Asynchronous training runs and cleanup of failed runs

mod orchestrator;
mod subprocess;

pub use orchestrator::{
    model_name_from_job_id, spawn_failure_listener, training_job_id, Trainer,
    TrainingOrchestrator, DEFAULT_ITERATIONS,
};
pub use subprocess::SubprocessTrainer;
