//! Engine transport over child-process stdio

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::channel::MessageChannel;
use crate::error::EngineError;

/// A spawned engine process speaking UCI over its stdin/stdout.
pub struct ProcessChannel {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessChannel {
    /// Spawn the engine binary at `path` with piped stdio.
    pub fn spawn(path: &str) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Channel(format!("failed to spawn engine at {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Channel("engine stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Channel("engine stdout unavailable".into()))?;

        Ok(Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

#[async_trait]
impl MessageChannel for ProcessChannel {
    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        debug!(command, "engine <");
        self.stdin
            .write_all(format!("{command}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Channel(format!("failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EngineError::Channel(format!("failed to flush engine stdin: {e}")))?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, EngineError> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| EngineError::Channel(format!("failed to read from engine: {e}")))?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        debug!(line = trimmed, "engine >");
        Ok(Some(trimmed.to_string()))
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}
