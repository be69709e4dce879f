//! Interactive console input.
//!
//! Both readers are generic over `BufRead`/`Write` so they can be driven from
//! in-memory buffers in tests.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::core::requirements::{Requirement, is_end_marker, parse_requirement};

/// Prompt for `ClassName: description` lines until `END` or end of input.
pub fn collect_requirements<R: BufRead, W: Write>(input: R, out: &mut W) -> Result<Vec<Requirement>> {
    writeln!(out, "Please enter each class and its description following this structure:")?;
    writeln!(out, "ClassName: Class function description and requirements.")?;
    writeln!(out, "Type 'END' on a new line to finish.")?;
    out.flush().context("flush prompt")?;

    let mut requirements = Vec::new();
    for line in input.lines() {
        let line = line.context("read requirement line")?;
        if is_end_marker(&line) {
            break;
        }
        match parse_requirement(&line) {
            Some(requirement) => requirements.push(requirement),
            None => {
                writeln!(out, "Input does not match expected format. Please try again.")?;
                out.flush().context("flush prompt")?;
            }
        }
    }
    Ok(requirements)
}

/// Read raw source text until a line reading exactly `END` or end of input.
pub fn read_source_block<R: BufRead, W: Write>(input: R, out: &mut W) -> Result<String> {
    writeln!(out, "Enter text (type 'END' on a new line to finish): ")?;
    out.flush().context("flush prompt")?;

    let mut lines = Vec::new();
    for line in input.lines() {
        let line = line.context("read source line")?;
        if line == "END" {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}
