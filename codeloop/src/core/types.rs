//! Shared round bookkeeping types.
//!
//! These describe what happened in one generate/verify round. They carry no
//! behavior beyond simple queries and serialize into the round log.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::verdict::Verdict;

/// First unit of a round that the analyzer rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    /// Declared type name.
    pub unit: String,
    /// Path of the (now deleted) unit file.
    pub path: PathBuf,
    /// Analyzer output, verbatim.
    pub diagnostic: String,
}

impl UnitFailure {
    /// File name component of `path`, falling back to the full path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Verdict recorded for one checked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckedFile {
    pub path: PathBuf,
    pub verdict: Verdict,
}

/// Everything one round produced.
///
/// `checked` stops at the first diagnostic; files after it are written but not
/// verified in this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    /// Round number (1-indexed).
    pub attempt: u32,
    /// Unit files written, in emission order.
    pub files: Vec<PathBuf>,
    pub checked: Vec<CheckedFile>,
    pub failure: Option<UnitFailure>,
}

impl RoundOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// Files whose analyzer run failed to produce a result.
    pub fn unverified(&self) -> impl Iterator<Item = &PathBuf> {
        self.checked
            .iter()
            .filter(|file| matches!(file.verdict, Verdict::ToolFailed(_)))
            .map(|file| &file.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unverified_lists_only_tool_failures() {
        let round = RoundOutcome {
            attempt: 1,
            files: vec![PathBuf::from("out/A.java"), PathBuf::from("out/B.java")],
            checked: vec![
                CheckedFile {
                    path: PathBuf::from("out/A.java"),
                    verdict: Verdict::ToolFailed("timeout".to_string()),
                },
                CheckedFile {
                    path: PathBuf::from("out/B.java"),
                    verdict: Verdict::Clean,
                },
            ],
            failure: None,
        };
        assert!(round.passed());
        let unverified: Vec<&PathBuf> = round.unverified().collect();
        assert_eq!(unverified, vec![&PathBuf::from("out/A.java")]);
    }

    #[test]
    fn failure_file_name_is_last_component() {
        let failure = UnitFailure {
            unit: "Foo".to_string(),
            path: PathBuf::from("out/Foo.java"),
            diagnostic: "boom".to_string(),
        };
        assert_eq!(failure.file_name(), "Foo.java");
    }
}
