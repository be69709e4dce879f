//! Request rendering for the generator.
//!
//! Templates live next to this module and are compiled into the binary.

use anyhow::Result;
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::language::SourceLanguage;
use crate::core::requirements::Requirement;
use crate::core::types::UnitFailure;

const REQUEST_TEMPLATE: &str = include_str!("prompts/request.md");
const REPAIR_TEMPLATE: &str = include_str!("prompts/repair.md");

/// Template engine wrapper around minijinja.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("request", REQUEST_TEMPLATE)
            .expect("request template should be valid");
        env.add_template("repair", REPAIR_TEMPLATE)
            .expect("repair template should be valid");
        Self { env }
    }

    /// Initial request asking for one type per requirement.
    pub fn render_request(
        &self,
        language: SourceLanguage,
        requirements: &[Requirement],
    ) -> Result<String> {
        let template = self.env.get_template("request")?;
        let rendered = template.render(context! {
            language => language.display_name(),
            requirements => requirements,
        })?;
        debug!(requirements = requirements.len(), bytes = rendered.len(), "rendered request");
        Ok(rendered)
    }

    /// Problem report asking the model to regenerate a rejected unit.
    pub fn render_repair(&self, language: SourceLanguage, failure: &UnitFailure) -> Result<String> {
        let template = self.env.get_template("repair")?;
        let rendered = template.render(context! {
            language => language.display_name(),
            file_name => failure.file_name(),
            unit => failure.unit.as_str(),
            diagnostic => failure.diagnostic.trim(),
        })?;
        debug!(unit = %failure.unit, bytes = rendered.len(), "rendered repair request");
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn request_lists_each_requirement() {
        let renderer = PromptRenderer::new();
        let rendered = renderer
            .render_request(
                SourceLanguage::Java,
                &[
                    Requirement {
                        name: "Account".to_string(),
                        description: "holds a balance".to_string(),
                    },
                    Requirement {
                        name: "Bank".to_string(),
                        description: "manages accounts".to_string(),
                    },
                ],
            )
            .expect("render");

        assert!(rendered.starts_with(
            "Write a programme in Java that performs the following functions:\n"
        ));
        assert!(rendered.contains("Define a [Account] class, [holds a balance].\n"));
        assert!(rendered.contains("Define a [Bank] class, [manages accounts].\n"));
    }

    #[test]
    fn repair_names_file_and_quotes_diagnostic() {
        let renderer = PromptRenderer::new();
        let failure = UnitFailure {
            unit: "Account".to_string(),
            path: PathBuf::from("output/Account.java"),
            diagnostic: "Account.java:4: error: NULL_DEREFERENCE <object> `x`\n".to_string(),
        };

        let rendered = renderer
            .render_repair(SourceLanguage::Java, &failure)
            .expect("render");
        assert!(rendered.contains("Account.java reported"));
        assert!(rendered.contains("Account.java:4: error: NULL_DEREFERENCE <object> `x`"));
        assert!(rendered.contains("corrected Java code for `Account`"));
    }
}
