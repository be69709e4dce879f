//! Brace-depth partitioning of a generated source block into per-type units.
//!
//! The scanner is a two-state machine over lines: `Idle` until a declaration
//! line starts a unit, then `InUnit` while the brace balance stays positive.
//! Braces inside strings and comments are counted like any other brace, so
//! unusual input can shift unit boundaries; it never panics.

use tracing::{debug, warn};

use crate::core::language::{DeclarationLine, SourceLanguage};

/// One top-level type declaration extracted from a source block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Declared type name.
    pub name: String,
    /// File extension without the dot.
    pub extension: &'static str,
    /// Import header shared by every unit of the block.
    pub header: String,
    /// Declaration line through the matching closing-brace line, verbatim.
    pub body: String,
}

impl SourceUnit {
    /// `<name>.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.extension)
    }

    /// File contents: import header followed by the body.
    pub fn contents(&self) -> String {
        format!("{}{}", self.header, self.body)
    }
}

enum ScanState {
    Idle,
    InUnit {
        name: String,
        depth: i64,
        /// Set once the unit has seen its first opening brace.
        opened: bool,
        buffer: String,
    },
}

/// Collect import statements in order, followed by a blank separator line.
///
/// Returns an empty string when the text has no imports. Applying this to its
/// own output returns the same header.
pub fn extract_imports(text: &str, language: SourceLanguage) -> String {
    let imports: Vec<&str> = text
        .lines()
        .filter(|line| language.is_import(line))
        .collect();
    if imports.is_empty() {
        return String::new();
    }
    let mut header = imports.join("\n");
    header.push_str("\n\n");
    header
}

/// Split `text` into one unit per top-level type declaration.
///
/// Unterminated units at end of input are dropped. Declarations whose name
/// cannot be read are skipped so that earlier units survive.
pub fn split_into_units(text: &str, language: SourceLanguage) -> Vec<SourceUnit> {
    let header = extract_imports(text, language);
    let mut units = Vec::new();
    let mut state = ScanState::Idle;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        let content = line.trim_end_matches(['\n', '\r']);
        let (opens, closes) = brace_counts(content);

        state = match state {
            ScanState::Idle => match language.declaration(content) {
                DeclarationLine::None => ScanState::Idle,
                DeclarationLine::Malformed => {
                    warn!(
                        line = index + 1,
                        text = content,
                        "skipping declaration without a readable type name"
                    );
                    ScanState::Idle
                }
                DeclarationLine::Named(name) => advance(
                    &mut units,
                    &header,
                    language,
                    name.to_string(),
                    opens - closes,
                    opens > 0,
                    line.to_string(),
                    index,
                ),
            },
            ScanState::InUnit {
                name,
                depth,
                opened,
                mut buffer,
            } => {
                buffer.push_str(line);
                advance(
                    &mut units,
                    &header,
                    language,
                    name,
                    depth + opens - closes,
                    opened || opens > 0,
                    buffer,
                    index,
                )
            }
        };
    }

    if let ScanState::InUnit { name, depth, .. } = state {
        debug!(name, depth, "discarding unterminated unit at end of input");
    }
    units
}

/// Apply the depth check after a line has been folded into the active unit.
#[allow(clippy::too_many_arguments)]
fn advance(
    units: &mut Vec<SourceUnit>,
    header: &str,
    language: SourceLanguage,
    name: String,
    depth: i64,
    opened: bool,
    buffer: String,
    index: usize,
) -> ScanState {
    if depth < 0 {
        warn!(
            name,
            line = index + 1,
            "brace depth went negative, discarding unit"
        );
        return ScanState::Idle;
    }
    if opened && depth == 0 {
        debug!(name, line = index + 1, "unit complete");
        units.push(SourceUnit {
            name,
            extension: language.extension(),
            header: header.to_string(),
            body: buffer,
        });
        return ScanState::Idle;
    }
    ScanState::InUnit {
        name,
        depth,
        opened,
        buffer,
    }
}

fn brace_counts(line: &str) -> (i64, i64) {
    line.chars().fold((0, 0), |(opens, closes), ch| match ch {
        '{' => (opens + 1, closes),
        '}' => (opens, closes + 1),
        _ => (opens, closes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAVA: SourceLanguage = SourceLanguage::Java;

    fn names(units: &[SourceUnit]) -> Vec<&str> {
        units.iter().map(|unit| unit.name.as_str()).collect()
    }

    #[test]
    fn one_line_declarations_are_separate_units() {
        let units = split_into_units("class Foo { int x; }\nclass Bar { void m(){} }", JAVA);
        assert_eq!(names(&units), vec!["Foo", "Bar"]);
        assert_eq!(units[0].body, "class Foo { int x; }\n");
        assert_eq!(units[1].body, "class Bar { void m(){} }");
        assert_eq!(units[0].file_name(), "Foo.java");
        assert_eq!(units[0].contents(), "class Foo { int x; }\n");
    }

    #[test]
    fn bodies_reproduce_input_slices() {
        let foo = "public class Foo {\n    private int x;\n    public int x() {\n        return x;\n    }\n}\n";
        let bar = "enum Bar {\n    A, B;\n}\n";
        let text = format!("Here you go:\n\n{foo}\n{bar}Hope this helps.\n");

        let units = split_into_units(&text, JAVA);
        assert_eq!(names(&units), vec!["Foo", "Bar"]);
        assert_eq!(units[0].body, foo);
        assert_eq!(units[1].body, bar);
    }

    #[test]
    fn nested_types_stay_inside_their_parent() {
        let text = "class Outer {\n    static class Inner {\n        int y;\n    }\n}\nclass Next {}\n";
        let units = split_into_units(text, JAVA);
        assert_eq!(names(&units), vec!["Outer", "Next"]);
        assert!(units[0].body.contains("static class Inner"));
    }

    #[test]
    fn brace_on_following_line_does_not_close_on_declaration() {
        let text = "public class Foo\n    extends Base\n{\n    int x;\n}\n";
        let units = split_into_units(text, JAVA);
        assert_eq!(names(&units), vec!["Foo"]);
        assert_eq!(units[0].body, text);
    }

    #[test]
    fn imports_are_prepended_to_every_unit() {
        let text = "import java.util.List;\nimport java.util.Map;\n\nclass A {}\nclass B {}\n";
        let units = split_into_units(text, JAVA);
        let header = "import java.util.List;\nimport java.util.Map;\n\n";
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|unit| unit.header == header));
        assert_eq!(units[1].contents(), format!("{header}class B {{}}\n"));
    }

    #[test]
    fn extract_imports_is_idempotent() {
        let text = "import a.B;\nclass X {}\nimport c.D;\nimport a.B;\n";
        let header = extract_imports(text, JAVA);
        assert_eq!(header, "import a.B;\nimport c.D;\nimport a.B;\n\n");
        assert_eq!(extract_imports(&header, JAVA), header);
    }

    #[test]
    fn extract_imports_without_imports_is_empty() {
        assert_eq!(extract_imports("class X {}", JAVA), "");
        assert_eq!(extract_imports("", JAVA), "");
    }

    #[test]
    fn no_declarations_yields_no_units() {
        assert!(split_into_units("int x = 1;\n{ }\n", JAVA).is_empty());
        assert!(split_into_units("", JAVA).is_empty());
    }

    #[test]
    fn unterminated_unit_is_dropped() {
        let text = "class Done {}\nclass Open {\n    void m() {\n";
        let units = split_into_units(text, JAVA);
        assert_eq!(names(&units), vec!["Done"]);
    }

    #[test]
    fn malformed_declaration_is_skipped_and_scanning_continues() {
        let text = "class Good {}\npublic class {\nclass AlsoGood {\n}\n";
        let units = split_into_units(text, JAVA);
        assert_eq!(names(&units), vec!["Good", "AlsoGood"]);
    }

    #[test]
    fn negative_depth_discards_unit() {
        let text = "class Broken { } }\nclass Fine {}\n";
        let units = split_into_units(text, JAVA);
        assert_eq!(names(&units), vec!["Fine"]);
    }

    #[test]
    fn braces_in_strings_do_not_panic() {
        let text = "class Weird {\n    String s = \"}\";\n}\nclass After {}\n";
        let units = split_into_units(text, JAVA);
        // The quoted brace closes `Weird` early; the stray `}` is ignored while idle.
        assert_eq!(names(&units), vec!["Weird", "After"]);
        assert_eq!(units[0].body, "class Weird {\n    String s = \"}\";\n");
    }

    #[test]
    fn crlf_lines_are_kept_verbatim() {
        let text = "class Foo {\r\n}\r\n";
        let units = split_into_units(text, JAVA);
        assert_eq!(units[0].body, text);
    }

    #[test]
    fn annotated_declarations_start_units() {
        let text = "@FunctionalInterface public interface Op {\n int apply(int x);\n}\n@Deprecated class Legacy {\n    static class Helper {\n    }\n}\n";
        let units = split_into_units(text, JAVA);
        assert_eq!(names(&units), vec!["Op", "Legacy"]);
        assert_eq!(
            units[1].body,
            "@Deprecated class Legacy {\n    static class Helper {\n    }\n}\n"
        );
    }

    #[test]
    fn csharp_attributes_start_units() {
        let text = "[Serializable] public class Ledger {\n    [NonSerialized] private int cache;\n}\n";
        let units = split_into_units(text, SourceLanguage::Csharp);
        assert_eq!(names(&units), vec!["Ledger"]);
    }

    #[test]
    fn csharp_units_use_cs_extension() {
        let text = "using System;\n\nnamespace Bank {\n}\npublic class Account {\n}\n";
        let units = split_into_units(text, SourceLanguage::Csharp);
        assert_eq!(names(&units), vec!["Account"]);
        assert_eq!(units[0].file_name(), "Account.cs");
        assert!(units[0].contents().starts_with("using System;\n\n"));
    }
}
