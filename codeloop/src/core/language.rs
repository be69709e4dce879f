//! Source-language conventions the partitioner relies on.
//!
//! Each language contributes a file extension, an import-statement pattern and
//! the shape of a top-level type declaration line. Nothing here understands
//! the language beyond those line-level patterns.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static JAVA_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^import\s+.*;$").expect("java import pattern"));
// Annotations (`@Name`, `@Name(...)`) and modifiers may precede the keyword in any order.
const JAVA_PREFIX: &str = r"^\s*(?:(?:@[A-Za-z_$][\w$.]*(?:\([^)]*\)\s*|\s+))|(?:(?:public|protected|private|static|final|abstract|sealed|non-sealed|strictfp)\s+))*";
const JAVA_KEYWORD: &str = r"(?:class|interface|enum|record|@interface)";

static JAVA_DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{JAVA_PREFIX}{JAVA_KEYWORD}(?:\s|\{{|$)"))
        .expect("java declaration pattern")
});
static JAVA_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{JAVA_PREFIX}{JAVA_KEYWORD}\s+([A-Za-z_$][A-Za-z0-9_$]*)"
    ))
    .expect("java name pattern")
});

static CSHARP_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^using\s+.*;$").expect("csharp using pattern"));
// `[Attribute]` lists come first, then modifiers.
const CSHARP_PREFIX: &str = r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|protected|private|internal|static|sealed|abstract|partial|readonly|unsafe|file|new)\s+)*";
const CSHARP_KEYWORD: &str = r"(?:class|interface|enum|struct|record)";

static CSHARP_DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{CSHARP_PREFIX}{CSHARP_KEYWORD}(?:\s|\{{|$)"))
        .expect("csharp declaration pattern")
});
static CSHARP_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{CSHARP_PREFIX}{CSHARP_KEYWORD}\s+([A-Za-z_][A-Za-z0-9_]*)"
    ))
    .expect("csharp name pattern")
});

/// Language of the generated source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    #[default]
    Java,
    Csharp,
}

/// How a single line relates to a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationLine<'a> {
    /// Not a declaration line.
    None,
    /// Declaration keyword followed by this identifier.
    Named(&'a str),
    /// Looks like a declaration but the identifier cannot be read.
    Malformed,
}

impl SourceLanguage {
    /// File extension for emitted units, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Csharp => "cs",
        }
    }

    /// Human-readable language name used in prompts.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Java => "Java",
            Self::Csharp => "C#",
        }
    }

    /// Whether `line` is a whole import statement anchored at column 0.
    pub fn is_import(self, line: &str) -> bool {
        match self {
            Self::Java => JAVA_IMPORT_RE.is_match(line),
            Self::Csharp => CSHARP_IMPORT_RE.is_match(line),
        }
    }

    /// Classify `line` as a top-level type declaration.
    pub fn declaration(self, line: &str) -> DeclarationLine<'_> {
        let (start, name) = match self {
            Self::Java => (&*JAVA_DECLARATION_RE, &*JAVA_NAME_RE),
            Self::Csharp => (&*CSHARP_DECLARATION_RE, &*CSHARP_NAME_RE),
        };
        if !start.is_match(line) {
            return DeclarationLine::None;
        }
        match name.captures(line).and_then(|caps| caps.get(1)) {
            Some(ident) => DeclarationLine::Named(ident.as_str()),
            None => DeclarationLine::Malformed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Csharp => "csharp",
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceLanguage {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Self::Java),
            "csharp" | "c#" | "cs" => Ok(Self::Csharp),
            other => Err(format!(
                "unsupported language '{other}' (expected java or csharp)"
            )),
        }
    }
}
