//! Static analyzer adapter.
//!
//! The [`Analyzer`] trait decouples the repair loop from the actual tool
//! (Infer by default). Tests use scripted analyzers that return predetermined
//! verdicts without spawning processes.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::verdict::{Verdict, VerdictRules};
use crate::io::config::AnalyzerConfig;
use crate::io::process::run_tool;

const FILE_PLACEHOLDER: &str = "{file}";

/// Abstraction over static analysis backends.
pub trait Analyzer {
    /// Analyze one unit file.
    ///
    /// Tool-level failures are reported as [`Verdict::ToolFailed`]; an `Err`
    /// means the analysis could not be attempted at all.
    fn analyze(&self, path: &Path) -> Result<Verdict>;
}

/// Analyzer that runs a configured command per file.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
    rules: VerdictRules,
}

impl CommandAnalyzer {
    pub fn from_config(cfg: &AnalyzerConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            command: cfg.command.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            output_limit_bytes: cfg.output_limit_bytes,
            rules: cfg.rules()?,
        })
    }

    /// Argv for `path`: `{file}` substituted, or the path appended.
    fn argv(&self, path: &Path) -> Vec<String> {
        let file = path.display().to_string();
        let mut argv: Vec<String> = self
            .command
            .iter()
            .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
            .collect();
        if !self.command.iter().any(|arg| arg.contains(FILE_PLACEHOLDER)) {
            argv.push(file);
        }
        argv
    }
}

impl Analyzer for CommandAnalyzer {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn analyze(&self, path: &Path) -> Result<Verdict> {
        let argv = self.argv(path);
        info!(command = ?argv, "running analyzer");

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);

        let run = match run_tool(cmd, self.timeout, self.output_limit_bytes) {
            Ok(run) => run,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(reason, "analyzer could not be run");
                return Ok(Verdict::ToolFailed(reason));
            }
        };
        if run.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "analyzer timed out");
            return Ok(Verdict::ToolFailed(format!(
                "analyzer timed out after {}s",
                self.timeout.as_secs()
            )));
        }

        let verdict = self.rules.classify(run.exit_code, &run.report);
        if let Verdict::ToolFailed(reason) = &verdict {
            warn!(exit_code = ?run.exit_code, reason, "analyzer failed");
        }
        debug!(?verdict, "analyzer finished");
        Ok(verdict)
    }
}
