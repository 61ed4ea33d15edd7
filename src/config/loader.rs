// Configuration loader
// Loads settings from a TOML file, then applies environment overrides

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;

/// Environment variable overriding `model_dir`
pub const MODEL_DIR_ENV: &str = "REDACTOR_MODEL_DIR";
/// Environment variable overriding `bind_address`
pub const BIND_ENV: &str = "REDACTOR_BIND";

/// Load configuration
///
/// Lookup order: the explicit path (must exist), then
/// `~/.redactor/config.toml`, then built-in defaults. Environment
/// overrides are applied last.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config> {
    let mut config = match explicit_path {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".redactor").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(MODEL_DIR_ENV).filter(|v| !v.is_empty()) {
        config.model_dir = PathBuf::from(dir);
    }
    if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.is_empty()) {
        config.bind_address = bind;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollaboratorConfig;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address, "127.0.0.1:5000");
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.trainer.program, "python3");
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
model_dir = "/srv/models"

[trainer]
program = "/opt/redactor/bin/train"
"#,
        )?;

        let config = read_config_file(&path)?;
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.bind_address, "127.0.0.1:5000");
        assert_eq!(
            config.trainer,
            CollaboratorConfig {
                program: "/opt/redactor/bin/train".to_string(),
                args: vec![],
            }
        );
        assert_eq!(config.predictor.args, vec!["-m", "redactor.predict"]);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("/definitely/not/here.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            MODEL_DIR_ENV => Some("/data/models".to_string()),
            BIND_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.model_dir, PathBuf::from("/data/models"));
        // Empty values are ignored
        assert_eq!(config.bind_address, "127.0.0.1:5000");
    }
}
