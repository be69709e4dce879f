//! Running an analyzer as a child process.
//!
//! The analyzer's stdout and stderr are merged into a single report, chunk by
//! chunk in arrival order, under one capture budget. Infer and javac split
//! their findings across both streams, and the verdict rules read the report
//! as a whole.

use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Result of one analyzer invocation.
#[derive(Debug)]
pub struct ToolRun {
    /// `None` when the process was ended by a signal (including our own kill).
    pub exit_code: Option<i32>,
    /// Merged stdout and stderr, lossily decoded.
    pub report: String,
    /// Bytes read past the capture budget and dropped.
    pub dropped_bytes: usize,
    pub timed_out: bool,
}

/// Run `cmd` with no stdin and collect its merged report, killing it after `timeout`.
///
/// Both pipes are drained on reader threads while the tool runs, so a chatty
/// analyzer never blocks on a full pipe. At most `report_limit_bytes` are kept.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = timeout.as_secs()))]
pub fn run_tool(mut cmd: Command, timeout: Duration, report_limit_bytes: usize) -> Result<ToolRun> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning analyzer");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn analyzer");
            return Err(e).context("spawn tool");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (tx, rx) = mpsc::channel();
    let stdout_tx = tx.clone();
    thread::spawn(move || forward_chunks(stdout, &stdout_tx));
    thread::spawn(move || forward_chunks(stderr, &tx));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for tool")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "analyzer timed out, killing");
            timed_out = true;
            child.kill().context("kill tool")?;
            child.wait().context("wait tool after kill")?
        }
    };

    // Ends once both readers hit EOF and drop their senders.
    let mut report = Vec::new();
    let mut dropped_bytes = 0usize;
    for chunk in rx {
        let chunk = chunk.context("read analyzer output")?;
        dropped_bytes += append_limited(&mut report, &chunk, report_limit_bytes);
    }

    let mut report = String::from_utf8_lossy(&report).into_owned();
    if dropped_bytes > 0 {
        warn!(dropped_bytes, "analyzer report truncated");
        report.push_str(&format!("\n[analyzer output truncated, {dropped_bytes} bytes dropped]\n"));
    }

    debug!(exit_code = ?status.code(), timed_out, report_bytes = report.len(), "analyzer finished");
    Ok(ToolRun {
        exit_code: status.code(),
        report,
        dropped_bytes,
        timed_out,
    })
}

/// Send everything read from `reader` as chunks until EOF or a read error.
fn forward_chunks<R: Read>(mut reader: R, tx: &Sender<io::Result<Vec<u8>>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return,
            Ok(n) => {
                if tx.send(Ok(chunk[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

/// Append as much of `chunk` as fits under `limit`; returns the bytes dropped.
fn append_limited(report: &mut Vec<u8>, chunk: &[u8], limit: usize) -> usize {
    let keep = chunk.len().min(limit.saturating_sub(report.len()));
    report.extend_from_slice(&chunk[..keep]);
    chunk.len() - keep
}
