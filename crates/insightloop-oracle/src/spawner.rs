use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::OracleError;

/// Output captured from an oracle process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Utility for spawning oracle CLI processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process and capture its output
    pub async fn spawn(binary: &Path, args: &[&str]) -> Result<ProcessOutput, OracleError> {
        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            arg_count = args.len(),
            "Spawning oracle process"
        );

        let mut child = Command::new(binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                OracleError::Unavailable(format!("Failed to spawn {}: {}", binary.display(), e))
            })?;

        let stdout_handle = child
            .stdout
            .take()
            .ok_or_else(|| OracleError::Unavailable("stdout not captured".to_string()))?;
        let stderr_handle = child
            .stderr
            .take()
            .ok_or_else(|| OracleError::Unavailable("stderr not captured".to_string()))?;

        let mut stdout_reader = BufReader::new(stdout_handle).lines();
        let mut stderr_reader = BufReader::new(stderr_handle).lines();

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut stderr_open = true;

        // Read both streams concurrently
        loop {
            tokio::select! {
                biased;

                result = stdout_reader.next_line() => {
                    match result {
                        Ok(Some(line)) => {
                            trace!(line = %line, "stdout");
                            push_line(&mut stdout, &line);
                        }
                        Ok(None) => {
                            while stderr_open {
                                let Ok(Some(line)) = stderr_reader.next_line().await else {
                                    break;
                                };
                                trace!(line = %line, "stderr");
                                push_line(&mut stderr, &line);
                            }
                            break;
                        }
                        Err(e) => {
                            return Err(OracleError::Unavailable(format!(
                                "Failed to read stdout: {}",
                                e
                            )));
                        }
                    }
                }
                result = stderr_reader.next_line(), if stderr_open => {
                    match result {
                        Ok(Some(line)) => {
                            trace!(line = %line, "stderr");
                            push_line(&mut stderr, &line);
                        }
                        Ok(None) => stderr_open = false,
                        Err(e) => {
                            return Err(OracleError::Unavailable(format!(
                                "Failed to read stderr: {}",
                                e
                            )));
                        }
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| OracleError::Unavailable(format!("Failed to wait for process: {}", e)))?;
        let duration = start.elapsed();

        debug!(
            exit_code = status.code().unwrap_or(-1),
            duration_ms = duration.as_millis() as u64,
            "Oracle process completed"
        );

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
            duration,
        })
    }
}

fn push_line(buffer: &mut String, line: &str) {
    if !buffer.is_empty() {
        buffer.push('\n');
    }
    buffer.push_str(line);
}
