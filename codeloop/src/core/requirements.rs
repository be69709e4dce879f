//! Parsing of `ClassName: description` requirement lines.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static REQUIREMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+)\s*:\s*(.+)").expect("requirement pattern"));

/// One requested type and what it should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: String,
    pub description: String,
}

/// Requirements read from a block of text, plus the lines that were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementList {
    pub accepted: Vec<Requirement>,
    /// 1-indexed line numbers that did not match `Name: description`.
    pub rejected: Vec<usize>,
}

/// Parse a single `Name: description` line.
pub fn parse_requirement(line: &str) -> Option<Requirement> {
    let caps = REQUIREMENT_RE.captures(line)?;
    let name = caps.get(1)?.as_str().trim();
    let description = caps.get(2)?.as_str().trim();
    if name.is_empty() || description.is_empty() {
        return None;
    }
    Some(Requirement {
        name: name.to_string(),
        description: description.to_string(),
    })
}

/// `END` on its own line (any case, surrounding whitespace ignored) closes input.
pub fn is_end_marker(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("END")
}

/// Parse requirement lines up to the end of `text` or an `END` marker.
///
/// Blank lines are ignored.
pub fn parse_requirements(text: &str) -> RequirementList {
    let mut list = RequirementList::default();
    for (index, line) in text.lines().enumerate() {
        if is_end_marker(line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match parse_requirement(line) {
            Some(requirement) => list.accepted.push(requirement),
            None => list.rejected.push(index + 1),
        }
    }
    list
}
