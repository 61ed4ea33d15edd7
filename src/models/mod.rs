// Model registry
// Status of trained and training models, tracked as directories on disk

mod store;

pub use store::{
    validate_model_name, ModelStatus, ModelStore, ModelSummary, PRETRAINED_MODEL,
};
