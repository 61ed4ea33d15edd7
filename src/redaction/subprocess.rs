// Subprocess-backed predictor
//
// Runs the external prediction program once per request. The word list is
// written to stdin as a JSON array; the program prints {"H0": .., "H1": ..}.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::service::{Prediction, Predictor};
use crate::config::CollaboratorConfig;

/// Predictor that shells out to an external program
pub struct SubprocessPredictor {
    config: CollaboratorConfig,
}

impl SubprocessPredictor {
    pub fn new(config: CollaboratorConfig) -> Self {
        Self { config }
    }

    fn command(&self, model_name: &str) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg("--model")
            .arg(model_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Predictor for SubprocessPredictor {
    async fn predict(&self, words: &[String], model_name: &str) -> Result<Prediction> {
        let input = serde_json::to_vec(words).context("Failed to encode words")?;

        let mut child = self
            .command(model_name)
            .spawn()
            .with_context(|| format!("Failed to spawn predictor '{}'", self.config.program))?;

        // stdin is fed while stdout/stderr drain, so a predictor that logs
        // heavily before reading its input cannot fill a pipe and stall.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A predictor that exits early closes the pipe; its exit
                // status carries the real error.
                match stdin.write_all(&input).await {
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
                // Dropping stdin closes the pipe so the predictor sees EOF
            }
            Ok(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.context("Failed to wait for predictor")?;

        if !output.status.success() {
            anyhow::bail!(
                "Predictor exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        fed.context("Failed to write words to predictor")?;

        serde_json::from_slice(&output.stdout).context("Predictor produced invalid JSON output")
    }
}
