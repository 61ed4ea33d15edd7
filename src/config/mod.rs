// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{load_config, BIND_ENV, MODEL_DIR_ENV};
pub use settings::{CollaboratorConfig, Config};
