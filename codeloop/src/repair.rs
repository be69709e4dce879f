//! Generate → partition → verify loop with a bounded attempt budget.
//!
//! Each round sends the current request to the generator, splits the reply
//! into unit files and runs the analyzer over them in emission order, followed
//! by any files an earlier round wrote but never analyzed. The first
//! diagnostic deletes its file, ends the round, and becomes the next request.
//! The loop stops when a round has no diagnostic or the budget is spent; the
//! transcript is written in both cases. A converged run has analyzed every
//! unit file still on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{info, instrument, warn};

use crate::core::conversation::Conversation;
use crate::core::language::SourceLanguage;
use crate::core::partition::split_into_units;
use crate::core::types::{CheckedFile, RoundOutcome, UnitFailure};
use crate::core::verdict::Verdict;
use crate::io::analyzer::Analyzer;
use crate::io::generator::Generator;
use crate::io::prompt::PromptRenderer;
use crate::io::round_log::{RoundWriteRequest, write_round};
use crate::io::transcript::write_transcript;
use crate::io::units::{discard_unit, materialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Explicit configuration for one loop run.
#[derive(Debug, Clone)]
pub struct RepairConfig {
    pub max_attempts: u32,
    /// Must exist before the loop starts.
    pub output_dir: PathBuf,
    pub transcript_path: PathBuf,
    pub language: SourceLanguage,
    /// Write `.rounds/<n>/` logs under `output_dir`.
    pub record_rounds: bool,
}

impl RepairConfig {
    pub fn new(output_dir: impl Into<PathBuf>, language: SourceLanguage) -> Self {
        let output_dir = output_dir.into();
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            transcript_path: output_dir.join("dialogue_log.txt"),
            output_dir,
            language,
            record_rounds: true,
        }
    }
}

/// Progress notifications, emitted in the order things happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairEvent<'a> {
    RequestSent { attempt: u32, max_attempts: u32 },
    UnitWritten { path: &'a Path },
    NoUnits { attempt: u32 },
    Clean { path: &'a Path },
    Diagnostic { path: &'a Path, diagnostic: &'a str },
    ToolFailed { path: &'a Path, reason: &'a str },
    RoundFailed { attempt: u32, max_attempts: u32 },
}

/// Reason why `run_repair_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairStop {
    /// A round finished without any diagnostic.
    Converged,
    /// Every attempt ended with a diagnostic.
    Exhausted { last_failure: UnitFailure },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    /// Generation rounds executed.
    pub attempts: u32,
    pub stop: RepairStop,
    pub rounds: Vec<RoundOutcome>,
    /// Files whose most recent analysis failed at the tool level.
    pub unverified: Vec<PathBuf>,
    pub conversation: Conversation,
    pub transcript_path: PathBuf,
}

impl RepairOutcome {
    pub fn converged(&self) -> bool {
        self.stop == RepairStop::Converged
    }
}

/// Run rounds until the analyzer accepts a round or `max_attempts` is reached.
///
/// Generator and filesystem errors abort the run immediately without writing
/// the transcript.
#[instrument(skip_all, fields(max_attempts = config.max_attempts, language = %config.language))]
pub fn run_repair_loop<G: Generator, A: Analyzer, F: FnMut(&RepairEvent<'_>)>(
    generator: &G,
    analyzer: &A,
    config: &RepairConfig,
    mut conversation: Conversation,
    initial_request: String,
    mut on_event: F,
) -> Result<RepairOutcome> {
    if config.max_attempts == 0 {
        return Err(anyhow!("max_attempts must be > 0"));
    }
    let renderer = PromptRenderer::new();
    let mut request = initial_request;
    let mut rounds: Vec<RoundOutcome> = Vec::new();
    let mut pending: Vec<PendingUnit> = Vec::new();
    let mut attempts = 0u32;

    loop {
        let attempt = attempts + 1;
        on_event(&RepairEvent::RequestSent {
            attempt,
            max_attempts: config.max_attempts,
        });
        info!(attempt, "requesting generation");
        let reply = generator
            .generate(&request, &conversation)
            .with_context(|| format!("generate round {attempt}"))?;

        let round = verify_round(attempt, &reply, analyzer, config, &mut pending, &mut on_event)?;
        if config.record_rounds {
            write_round(&RoundWriteRequest {
                output_dir: &config.output_dir,
                request: &request,
                reply: &reply,
                outcome: &round,
            })?;
        }
        conversation.push_exchange(request, reply);
        let failure = round.failure.clone();
        rounds.push(round);

        let Some(failure) = failure else {
            info!(attempt, "round passed analysis");
            return finish(config, conversation, rounds, attempt, RepairStop::Converged);
        };

        if attempt == config.max_attempts {
            warn!(attempt, unit = %failure.unit, "attempt budget exhausted");
            return finish(
                config,
                conversation,
                rounds,
                attempt,
                RepairStop::Exhausted {
                    last_failure: failure,
                },
            );
        }

        on_event(&RepairEvent::RoundFailed {
            attempt,
            max_attempts: config.max_attempts,
        });
        request = renderer.render_repair(config.language, &failure)?;
        attempts += 1;
    }
}

/// Unit file written by an earlier round and not analyzed since.
#[derive(Debug, Clone)]
struct PendingUnit {
    unit: String,
    path: PathBuf,
}

/// Partition `reply`, write its units and analyze them until the first diagnostic.
///
/// Files in `pending` that this reply did not rewrite are analyzed after the
/// new units. Whatever the round leaves unanalyzed goes back into `pending`.
fn verify_round<A: Analyzer, F: FnMut(&RepairEvent<'_>)>(
    attempt: u32,
    reply: &str,
    analyzer: &A,
    config: &RepairConfig,
    pending: &mut Vec<PendingUnit>,
    on_event: &mut F,
) -> Result<RoundOutcome> {
    let units = split_into_units(reply, config.language);
    if units.is_empty() {
        warn!(attempt, "reply contained no type declarations");
        on_event(&RepairEvent::NoUnits { attempt });
    }
    let files = materialize(&units, &config.output_dir)?;
    for path in &files {
        on_event(&RepairEvent::UnitWritten { path });
    }

    let mut queue: Vec<PendingUnit> = units
        .iter()
        .zip(&files)
        .map(|(unit, path)| PendingUnit {
            unit: unit.name.clone(),
            path: path.clone(),
        })
        .collect();
    let carried: Vec<PendingUnit> = pending
        .drain(..)
        .filter(|old| !files.contains(&old.path))
        .collect();
    if !carried.is_empty() {
        info!(attempt, count = carried.len(), "re-checking units left unanalyzed by earlier rounds");
    }
    queue.extend(carried);

    let mut checked = Vec::with_capacity(queue.len());
    let mut failure = None;
    let mut queue = queue.into_iter();
    for next in queue.by_ref() {
        let path = &next.path;
        let verdict = analyzer
            .analyze(path)
            .with_context(|| format!("analyze {}", path.display()))?;
        match &verdict {
            Verdict::Clean => on_event(&RepairEvent::Clean { path }),
            Verdict::ToolFailed(reason) => {
                warn!(path = %path.display(), reason, "analyzer failed, keeping unit unverified");
                on_event(&RepairEvent::ToolFailed { path, reason });
            }
            Verdict::Diagnostic(diagnostic) => {
                info!(path = %path.display(), "analyzer reported a diagnostic");
                on_event(&RepairEvent::Diagnostic { path, diagnostic });
                discard_unit(path)?;
                failure = Some(UnitFailure {
                    unit: next.unit.clone(),
                    path: path.clone(),
                    diagnostic: diagnostic.clone(),
                });
            }
        }
        checked.push(CheckedFile {
            path: path.clone(),
            verdict,
        });
        if failure.is_some() {
            break;
        }
    }
    pending.extend(queue);

    Ok(RoundOutcome {
        attempt,
        files,
        checked,
        failure,
    })
}

fn finish(
    config: &RepairConfig,
    conversation: Conversation,
    rounds: Vec<RoundOutcome>,
    attempts: u32,
    stop: RepairStop,
) -> Result<RepairOutcome> {
    write_transcript(&config.transcript_path, &conversation)?;
    let unverified = unverified_files(&rounds);
    Ok(RepairOutcome {
        attempts,
        stop,
        rounds,
        unverified,
        conversation,
        transcript_path: config.transcript_path.clone(),
    })
}

/// Paths whose latest verdict across all rounds is a tool failure.
fn unverified_files(rounds: &[RoundOutcome]) -> Vec<PathBuf> {
    let mut latest: Vec<(&PathBuf, &Verdict)> = Vec::new();
    for file in rounds.iter().flat_map(|round| &round.checked) {
        match latest.iter().position(|(path, _)| *path == &file.path) {
            Some(index) => latest[index].1 = &file.verdict,
            None => latest.push((&file.path, &file.verdict)),
        }
    }
    latest
        .into_iter()
        .filter(|(_, verdict)| matches!(verdict, Verdict::ToolFailed(_)))
        .map(|(path, _)| path.clone())
        .collect()
}
