// Training subprocess
//
// Runs the external training program to completion. Output is captured and
// logged here; nothing except the trainer's own artifacts may land in the
// model directory, since any file there marks the model as ready.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::orchestrator::Trainer;
use crate::config::CollaboratorConfig;

/// Keep this many bytes of stderr in failure messages
const STDERR_TAIL_BYTES: usize = 2048;

/// Trainer that shells out to an external program
pub struct SubprocessTrainer {
    config: CollaboratorConfig,
    model_root: PathBuf,
}

impl SubprocessTrainer {
    pub fn new(config: CollaboratorConfig, model_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            model_root: model_root.into(),
        }
    }

    fn command(&self, model_name: &str, iterations: u32, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg("--model")
            .arg(model_name)
            .arg("--iterations")
            .arg(iterations.to_string())
            .arg("--output")
            .arg(output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Trainer for SubprocessTrainer {
    async fn train(&self, model_name: &str, iterations: u32) -> Result<()> {
        let output_dir = self.model_root.join(model_name);

        tracing::info!(
            model = %model_name,
            iterations,
            output = %output_dir.display(),
            "Starting training subprocess"
        );

        let output = self
            .command(model_name, iterations, &output_dir)
            .output()
            .await
            .with_context(|| format!("Failed to spawn trainer '{}'", self.config.program))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(model = %model_name, output = %stdout.trim(), "Trainer output");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Trainer exited with {}: {}",
                output.status,
                tail(stderr.trim(), STDERR_TAIL_BYTES)
            );
        }

        tracing::info!(model = %model_name, "Training subprocess finished");
        Ok(())
    }
}

/// Last `max` bytes of `text`, cut on a char boundary
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
