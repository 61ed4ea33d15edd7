// Directory-backed model registry
//
// Each model is a subdirectory of the model root. An empty directory means
// training is in progress; a non-empty one holds finished artifacts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::StoreError;

/// Name of the built-in model that is always available
pub const PRETRAINED_MODEL: &str = "pretrained";

/// Lifecycle state reported for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Ready,
    Training,
}

/// One entry of the model listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    #[serde(rename = "modelName")]
    pub name: String,
    pub status: ModelStatus,
}

impl ModelSummary {
    fn new(name: impl Into<String>, status: ModelStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Check that a model name is usable as a single directory name
pub fn validate_model_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Registry of models under a root directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    /// Open the store, creating the root directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_error(&root, e))?;

        if !root.join(PRETRAINED_MODEL).is_dir() {
            warn!(
                root = %root.display(),
                "Pretrained model directory is missing; predictions with the default model will fail"
            );
        }

        info!(root = %root.display(), "Model store opened");
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the artifacts of `name`
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// List every model, `pretrained` first, the rest sorted by name
    pub fn list_models(&self) -> Result<Vec<ModelSummary>, StoreError> {
        let mut others = Vec::new();

        let entries = fs::read_dir(&self.root).map_err(|e| io_error(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                debug!(path = %path.display(), "Skipping non UTF-8 model directory");
                continue;
            };
            if name == PRETRAINED_MODEL {
                continue;
            }

            // The directory may vanish between listing and inspection when a
            // failed job is cleaned up concurrently.
            match dir_status(&path) {
                Ok(status) => others.push(ModelSummary::new(name, status)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&path, e)),
            }
        }

        others.sort_by(|a, b| a.name.cmp(&b.name));

        let mut models = Vec::with_capacity(others.len() + 1);
        models.push(ModelSummary::new(PRETRAINED_MODEL, ModelStatus::Ready));
        models.extend(others);
        Ok(models)
    }

    /// Claim a model name by creating its (empty) directory
    ///
    /// Fails with `AlreadyExists` if the directory is already present. This
    /// is the only duplicate check for training requests.
    pub fn reserve(&self, name: &str) -> Result<(), StoreError> {
        validate_model_name(name)?;
        if name == PRETRAINED_MODEL {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let path = self.model_path(name);
        match fs::create_dir(&path) {
            Ok(()) => {
                debug!(model = %name, path = %path.display(), "Reserved model directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Remove a model directory after its training job failed
    ///
    /// Partial artifacts are removed with the directory. A missing directory
    /// is not an error. `pretrained` is never removed.
    pub fn release(&self, name: &str) -> Result<(), StoreError> {
        validate_model_name(name)?;
        if name == PRETRAINED_MODEL {
            warn!("Refusing to release the pretrained model");
            return Ok(());
        }

        let path = self.model_path(name);
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(model = %name, "Released model directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(model = %name, "Model directory already absent");
                Ok(())
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

fn dir_status(path: &Path) -> io::Result<ModelStatus> {
    let mut entries = fs::read_dir(path)?;
    Ok(if entries.next().is_some() {
        ModelStatus::Ready
    } else {
        ModelStatus::Training
    })
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_pretrained() -> (TempDir, ModelStore) {
        let dir = TempDir::new().unwrap();
        let pretrained = dir.path().join(PRETRAINED_MODEL);
        fs::create_dir(&pretrained).unwrap();
        fs::write(pretrained.join("model.bin"), b"weights").unwrap();
        let store = ModelStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("models");
        let store = ModelStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[test]
    fn test_list_starts_with_pretrained() {
        let (_dir, store) = store_with_pretrained();
        let models = store.list_models().unwrap();
        assert_eq!(
            models,
            vec![ModelSummary::new(PRETRAINED_MODEL, ModelStatus::Ready)]
        );
    }

    #[test]
    fn test_status_follows_directory_contents() {
        let (_dir, store) = store_with_pretrained();
        store.reserve("zeta").unwrap();
        store.reserve("alpha").unwrap();
        fs::write(store.model_path("alpha").join("weights.bin"), b"x").unwrap();
        fs::write(store.root().join("stray.txt"), b"not a model").unwrap();

        let models = store.list_models().unwrap();
        assert_eq!(
            models,
            vec![
                ModelSummary::new(PRETRAINED_MODEL, ModelStatus::Ready),
                ModelSummary::new("alpha", ModelStatus::Ready),
                ModelSummary::new("zeta", ModelStatus::Training),
            ]
        );
    }

    #[test]
    fn test_reserve_twice_fails() {
        let (_dir, store) = store_with_pretrained();
        store.reserve("beta").unwrap();
        let err = store.reserve("beta").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(name) if name == "beta"));
    }

    #[test]
    fn test_reserve_pretrained_fails_even_without_directory() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::open(dir.path()).unwrap();
        let err = store.reserve(PRETRAINED_MODEL).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert!(!dir.path().join(PRETRAINED_MODEL).exists());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (_dir, store) = store_with_pretrained();
        for name in ["", ".", "..", "a/b", "..\\up", "nul\0"] {
            assert!(
                matches!(store.reserve(name), Err(StoreError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_release_removes_partial_artifacts() {
        let (_dir, store) = store_with_pretrained();
        store.reserve("gamma").unwrap();
        fs::write(store.model_path("gamma").join("partial.bin"), b"half").unwrap();

        store.release("gamma").unwrap();
        assert!(!store.model_path("gamma").exists());

        // Absent directory is a no-op and the name is reusable
        store.release("gamma").unwrap();
        store.reserve("gamma").unwrap();
    }

    #[test]
    fn test_release_never_touches_pretrained() {
        let (_dir, store) = store_with_pretrained();
        store.release(PRETRAINED_MODEL).unwrap();
        assert!(store.model_path(PRETRAINED_MODEL).is_dir());
    }

    #[test]
    fn test_summary_serialization() {
        let json = serde_json::to_value(ModelSummary::new("m", ModelStatus::Training)).unwrap();
        assert_eq!(json, serde_json::json!({"modelName": "m", "status": "training"}));
    }
}
