//! Mode B: external usage helper process.
//!
//! Protocol: the helper is spawned with `--usage - <samplesPath>`, receives
//! the API JSON on stdin, and emits one JSON record per line on stdout
//! (covered-operation or error records). Exit code 0 is success; anything
//! else is reported but non-fatal. The host enforces a timeout and kills the
//! child on expiry or cancellation.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::warn;

use crate::{CancelToken, SurfaceError};

/// Poll interval for the child wait loop.
const WAIT_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct HelperConfig {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl HelperConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), timeout: Duration::from_secs(120) }
    }

    /// Availability probe with a reason usable in `unavailableReason`.
    pub fn availability(&self) -> Result<(), String> {
        if self.program.is_file() {
            Ok(())
        } else {
            Err(format!("usage helper not found at {}", self.program.display()))
        }
    }
}

/// One NDJSON record from the helper.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HelperEvent {
    #[serde(rename_all = "camelCase")]
    Covered {
        client_type: String,
        operation: String,
        file: String,
        line: u32,
        #[serde(default)]
        signature: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

/// Run the helper to completion, streaming its NDJSON output. Malformed
/// lines are dropped with a warning; timeout and helper failure surface as
/// `Error` events rather than failures.
pub fn run_helper(
    config: &HelperConfig,
    api_json: &str,
    samples_root: &Path,
    cancel: &CancelToken,
) -> Result<Vec<HelperEvent>, SurfaceError> {
    config
        .availability()
        .map_err(SurfaceError::HelperUnavailable)?;

    let mut child = Command::new(&config.program)
        .arg("--usage")
        .arg("-")
        .arg(samples_root)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            SurfaceError::HelperUnavailable(format!(
                "failed to spawn {}: {}",
                config.program.display(),
                e
            ))
        })?;

    // Start draining stdout before feeding stdin, so a chatty helper can
    // never deadlock both pipes.
    let stdout = child.stdout.take();
    let reader = std::thread::spawn(move || {
        let mut events = Vec::new();
        let mut dropped = 0usize;
        if let Some(out) = stdout {
            for line in BufReader::new(out).lines() {
                let Ok(line) = line else { break };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<HelperEvent>(trimmed) {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        dropped += 1;
                        warn!(error = %e, "usage helper emitted malformed record; dropped");
                    }
                }
            }
        }
        (events, dropped)
    });

    // Feed the API JSON and close stdin so the helper can start.
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(api_json.as_bytes()) {
            warn!(error = %e, "failed writing API JSON to usage helper");
        }
    }

    let started = Instant::now();
    let status = loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            let _ = reader.join();
            return Err(SurfaceError::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if started.elapsed() > config.timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                std::thread::sleep(WAIT_TICK);
            }
            Err(e) => {
                warn!(error = %e, "waiting on usage helper failed");
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        }
    };

    let (mut events, _dropped) = reader.join().unwrap_or_else(|_| (Vec::new(), 0));

    match status {
        Some(status) if status.success() => {}
        Some(status) => events.push(HelperEvent::Error {
            message: format!("usage helper exited with {}", status),
        }),
        None => events.push(HelperEvent::Error {
            message: format!(
                "usage helper timed out after {}s and was killed",
                config.timeout.as_secs()
            ),
        }),
    }
    Ok(events)
}
