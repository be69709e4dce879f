//! One-shot split-and-check used when no model credential is configured.
//!
//! The analyzer runs once per unit for reporting only: nothing is retried and
//! nothing is deleted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::language::SourceLanguage;
use crate::core::partition::split_into_units;
use crate::core::types::CheckedFile;
use crate::core::verdict::Verdict;
use crate::io::analyzer::Analyzer;
use crate::io::units::materialize;
use crate::repair::RepairEvent;

#[derive(Debug, Clone)]
pub struct SinglePassOutcome {
    pub files: Vec<PathBuf>,
    pub checked: Vec<CheckedFile>,
}

impl SinglePassOutcome {
    pub fn diagnostics(&self) -> usize {
        self.checked
            .iter()
            .filter(|file| file.verdict.diagnostic().is_some())
            .count()
    }
}

#[instrument(skip_all, fields(output_dir = %output_dir.display(), language = %language))]
pub fn run_single_pass<A: Analyzer, F: FnMut(&RepairEvent<'_>)>(
    source: &str,
    analyzer: &A,
    output_dir: &Path,
    language: SourceLanguage,
    mut on_event: F,
) -> Result<SinglePassOutcome> {
    let units = split_into_units(source, language);
    if units.is_empty() {
        on_event(&RepairEvent::NoUnits { attempt: 1 });
    }
    let files = materialize(&units, output_dir)?;

    let mut checked = Vec::with_capacity(files.len());
    for path in &files {
        on_event(&RepairEvent::UnitWritten { path });
        let verdict = analyzer
            .analyze(path)
            .with_context(|| format!("analyze {}", path.display()))?;
        match &verdict {
            Verdict::Clean => on_event(&RepairEvent::Clean { path }),
            Verdict::Diagnostic(diagnostic) => on_event(&RepairEvent::Diagnostic { path, diagnostic }),
            Verdict::ToolFailed(reason) => on_event(&RepairEvent::ToolFailed { path, reason }),
        }
        checked.push(CheckedFile {
            path: path.clone(),
            verdict,
        });
    }

    info!(units = files.len(), "single pass finished");
    Ok(SinglePassOutcome { files, checked })
}
