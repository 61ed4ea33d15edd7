// Redactor - Text redaction service
// Library exports

pub mod config;
pub mod errors;
pub mod jobs; // One-shot background jobs
pub mod models; // On-disk model registry
pub mod redaction;
pub mod server; // HTTP API
pub mod training;
