// Domain error types
//
// Typed errors for the pieces the HTTP layer needs to tell apart.
// Collaborator failures and startup errors stay in anyhow.

use thiserror::Error;

/// Errors raised by the on-disk model registry
#[derive(Debug, Error)]
pub enum StoreError {
    /// The model directory already exists (or the name is reserved)
    #[error("modelName {0} already exists.")]
    AlreadyExists(String),

    /// The name cannot be used as a single directory name
    #[error("Invalid modelName '{0}'.")]
    InvalidName(String),

    #[error("model store I/O failure for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the background job scheduler
#[derive(Debug, Error)]
pub enum JobError {
    /// A run with the same id is still scheduled or running
    #[error("job {0} is already scheduled")]
    AlreadyScheduled(String),
}

/// Errors returned when starting a training run
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("iterations must be a positive integer, got {0}")]
    InvalidIterations(u32),
}

/// Format a startup error for a model root that cannot be used
pub fn model_dir_unusable_error(path: &str, error: &str) -> String {
    format!(
        "Model directory is not usable: {}\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Point the server at an existing directory:\n\
           \x1b[36mredactor serve --model-dir /path/to/models\x1b[0m\n\n\
        2. Or set the environment variable:\n\
           \x1b[36mexport REDACTOR_MODEL_DIR=/path/to/models\x1b[0m",
        path, error
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_message_matches_api_contract() {
        let err = StoreError::AlreadyExists("alpha".to_string());
        assert_eq!(err.to_string(), "modelName alpha already exists.");
    }

    #[test]
    fn test_training_error_is_transparent_over_store_error() {
        let err: TrainingError = StoreError::AlreadyExists("beta".to_string()).into();
        assert_eq!(err.to_string(), "modelName beta already exists.");
    }

    #[test]
    fn test_model_dir_error_has_env_suggestion() {
        let msg = model_dir_unusable_error("/nope", "permission denied");
        assert!(msg.contains("REDACTOR_MODEL_DIR"));
        assert!(msg.contains("/nope"));
    }
}
