//! Test-only scripted collaborators for driving the loop without a model or analyzer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::conversation::Conversation;
use crate::core::verdict::Verdict;
use crate::io::analyzer::Analyzer;
use crate::io::generator::Generator;

/// Generator that replays queued replies and records every request.
pub struct ScriptedGenerator {
    replies: RefCell<VecDeque<String>>,
    requests: RefCell<Vec<String>>,
    history_lens: RefCell<Vec<usize>>,
}

impl ScriptedGenerator {
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().map(Into::into).collect()),
            requests: RefCell::new(Vec::new()),
            history_lens: RefCell::new(Vec::new()),
        }
    }

    /// The same reply for `count` rounds.
    pub fn repeating(reply: &str, count: usize) -> Self {
        Self::new(vec![reply; count])
    }

    /// Requests received, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// Conversation length seen by each call.
    pub fn history_lens(&self) -> Vec<usize> {
        self.history_lens.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, request: &str, conversation: &Conversation) -> Result<String> {
        self.requests.borrow_mut().push(request.to_string());
        self.history_lens.borrow_mut().push(conversation.len());
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted generator exhausted"))
    }
}

/// Analyzer that replays queued verdicts, then falls back to a fixed verdict.
///
/// Each call records the analyzed path and the file contents at that moment.
pub struct ScriptedAnalyzer {
    verdicts: RefCell<VecDeque<Verdict>>,
    fallback: Verdict,
    calls: RefCell<Vec<(PathBuf, Option<String>)>>,
}

impl ScriptedAnalyzer {
    /// Queued verdicts, then `Clean`.
    pub fn new(verdicts: Vec<Verdict>) -> Self {
        Self {
            verdicts: RefCell::new(verdicts.into()),
            fallback: Verdict::Clean,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn always(verdict: Verdict) -> Self {
        Self {
            verdicts: RefCell::new(VecDeque::new()),
            fallback: verdict,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Paths analyzed, in order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// File contents observed by each call (`None` if the file was missing).
    pub fn seen_contents(&self) -> Vec<Option<String>> {
        self.calls
            .borrow()
            .iter()
            .map(|(_, contents)| contents.clone())
            .collect()
    }
}

impl Analyzer for ScriptedAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Verdict> {
        let contents = fs::read_to_string(path).ok();
        self.calls.borrow_mut().push((path.to_path_buf(), contents));
        Ok(self
            .verdicts
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Diagnostic verdict in the shape a compiler-backed analyzer would report.
pub fn diagnostic(file: &str, message: &str) -> Verdict {
    Verdict::Diagnostic(format!("{file}:1: error: {message}"))
}
