//! Deterministic classification of analyzer output.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

/// Matches explicit clean-result phrasing (Infer prints `No issues found`).
pub const DEFAULT_CLEAN_PATTERN: &str = r"(?i)\bno issues found\b";

/// Matches `File.java:12: error: ...` style locations or Infer's `Found N issue(s)` summary.
pub const DEFAULT_DIAGNOSTIC_PATTERN: &str =
    r"(?m)(^\S+:\d+:(?:\d+:)?\s*(?:error|warning)\b)|(^Found \d+ issues?\b)";

/// Analyzer result for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    /// No defect reported.
    Clean,
    /// Defect text reported by the analyzer.
    Diagnostic(String),
    /// The analyzer itself could not produce a result (spawn error, timeout, crash).
    ToolFailed(String),
}

impl Verdict {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Diagnostic(text) => Some(text),
            _ => None,
        }
    }
}

/// Patterns that map raw analyzer output onto a [`Verdict`].
#[derive(Debug, Clone)]
pub struct VerdictRules {
    clean: Regex,
    diagnostic: Regex,
}

impl Default for VerdictRules {
    fn default() -> Self {
        Self {
            clean: Regex::new(DEFAULT_CLEAN_PATTERN).expect("default clean pattern"),
            diagnostic: Regex::new(DEFAULT_DIAGNOSTIC_PATTERN).expect("default diagnostic pattern"),
        }
    }
}

impl VerdictRules {
    pub fn new(clean_pattern: &str, diagnostic_pattern: &str) -> Result<Self> {
        Ok(Self {
            clean: Regex::new(clean_pattern)
                .with_context(|| format!("compile clean pattern {clean_pattern:?}"))?,
            diagnostic: Regex::new(diagnostic_pattern)
                .with_context(|| format!("compile diagnostic pattern {diagnostic_pattern:?}"))?,
        })
    }

    /// Classify a finished analyzer run.
    ///
    /// - `Clean` if the output says so explicitly.
    /// - `Diagnostic` if the output contains a recognizable defect, whatever the exit code.
    /// - `Clean` on a successful exit with nothing recognizable.
    /// - `ToolFailed` on an unsuccessful exit with nothing recognizable.
    pub fn classify(&self, exit_code: Option<i32>, output: &str) -> Verdict {
        let trimmed = output.trim();
        if self.clean.is_match(trimmed) {
            return Verdict::Clean;
        }
        if self.diagnostic.is_match(trimmed) {
            return Verdict::Diagnostic(trimmed.to_string());
        }
        match exit_code {
            Some(0) => Verdict::Clean,
            Some(code) => Verdict::ToolFailed(format!(
                "analyzer exited with status {code} without a recognizable diagnostic"
            )),
            None => Verdict::ToolFailed("analyzer terminated by signal".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_no_issues_is_clean() {
        let rules = VerdictRules::default();
        assert_eq!(
            rules.classify(Some(0), "Capturing...\n  No issues found  \n"),
            Verdict::Clean
        );
    }

    #[test]
    fn infer_report_is_a_diagnostic() {
        let rules = VerdictRules::default();
        let output = "Found 1 issue\n\nsrc/Foo.java:7: error: Null Dereference\n  object `s` is null\n";
        let verdict = rules.classify(Some(0), output);
        assert_eq!(verdict.diagnostic(), Some(output.trim()));
    }

    #[test]
    fn compiler_error_with_failing_exit_is_a_diagnostic() {
        let rules = VerdictRules::default();
        let verdict = rules.classify(Some(1), "Foo.java:3: error: ';' expected\n");
        assert!(verdict.diagnostic().is_some());
    }

    #[test]
    fn failing_exit_without_diagnostic_is_tool_failure() {
        let rules = VerdictRules::default();
        let verdict = rules.classify(Some(2), "infer: command not found");
        assert!(matches!(verdict, Verdict::ToolFailed(_)));
        assert!(matches!(rules.classify(None, ""), Verdict::ToolFailed(_)));
    }

    #[test]
    fn silent_success_is_clean() {
        assert!(VerdictRules::default().classify(Some(0), "").is_clean());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = VerdictRules::new("(", DEFAULT_DIAGNOSTIC_PATTERN).unwrap_err();
        assert!(err.to_string().contains("clean pattern"));
    }
}
