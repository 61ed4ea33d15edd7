// Redaction
// Word-level prediction through an external collaborator

mod service;
mod subprocess;

pub use service::{split_words, Prediction, Predictor, RedactionService};
pub use subprocess::SubprocessPredictor;
