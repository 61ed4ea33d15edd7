// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// External program invoked for prediction or training
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Executable to run (e.g. "python3")
    pub program: String,

    /// Leading arguments, before the per-call flags
    #[serde(default)]
    pub args: Vec<String>,
}

impl CollaboratorConfig {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Root directory holding one subdirectory per model
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default = "default_predictor")]
    pub predictor: CollaboratorConfig,

    #[serde(default = "default_trainer")]
    pub trainer: CollaboratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            model_dir: default_model_dir(),
            predictor: default_predictor(),
            trainer: default_trainer(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_predictor() -> CollaboratorConfig {
    CollaboratorConfig::new("python3", &["-m", "redactor.predict"])
}

fn default_trainer() -> CollaboratorConfig {
    CollaboratorConfig::new("python3", &["-m", "redactor.train"])
}
