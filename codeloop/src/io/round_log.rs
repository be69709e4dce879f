//! Per-round logging under `<output_dir>/.rounds/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::types::RoundOutcome;

#[derive(Debug, Clone)]
pub struct RoundPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub request_path: PathBuf,
    pub reply_path: PathBuf,
}

impl RoundPaths {
    pub fn new(output_dir: &Path, attempt: u32) -> Self {
        let dir = output_dir.join(".rounds").join(attempt.to_string());
        Self {
            dir: dir.clone(),
            meta_path: dir.join("meta.json"),
            request_path: dir.join("request.md"),
            reply_path: dir.join("reply.txt"),
        }
    }
}

pub struct RoundWriteRequest<'a> {
    pub output_dir: &'a Path,
    pub request: &'a str,
    pub reply: &'a str,
    pub outcome: &'a RoundOutcome,
}

/// Record one round: outcome metadata, the request sent and the raw reply.
pub fn write_round(request: &RoundWriteRequest<'_>) -> Result<RoundPaths> {
    let paths = RoundPaths::new(request.output_dir, request.outcome.attempt);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create round dir {}", paths.dir.display()))?;

    // Write in deterministic order to keep logs stable.
    write_json(&paths.meta_path, request.outcome)?;
    write_text(&paths.request_path, request.request)?;
    write_text(&paths.reply_path, request.reply)?;

    Ok(paths)
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_text(path, &buf)
}
