//! Prompt templates and system-prompt assembly.
//!
//! The system prompt handed to the LLM is the selected skill's
//! `prompt_template` (its `skill.md` contents) with a rendered block of
//! recalled online-memory facts appended, when any were found.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::memory::online::RecalledMemory;

/// A prompt template using Handlebars syntax.
pub struct PromptTemplate {
    name: String,
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        let name = name.into();
        let mut registry = Handlebars::new();

        registry
            .register_template_string(&name, template)
            .map_err(|e| Error::Internal(format!("Invalid template: {}", e)))?;

        Ok(PromptTemplate { name, registry })
    }

    /// Render the template with given data
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.registry
            .render(&self.name, data)
            .map_err(|e| Error::Internal(format!("Template render error: {}", e)))
    }
}

/// Assemble the system prompt for a turn: the skill's prompt template,
/// optionally followed by a "Relevant Memory" section summarizing recalled
/// online-memory facts. An empty `memories` slice yields the skill prompt
/// unchanged.
pub fn build_system_prompt(skill_prompt_template: &str, memories: &[RecalledMemory]) -> String {
    if memories.is_empty() {
        return skill_prompt_template.to_string();
    }

    let mut section = String::from("\n\n## Relevant Memory\n\n");
    for memory in memories {
        section.push_str(&format!("- ({}) {}\n", memory.source, memory.content));
    }

    format!("{}{}", skill_prompt_template, section)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_memories_leave_prompt_untouched() {
        let prompt = build_system_prompt("You are a CAD assistant.", &[]);
        assert_eq!(prompt, "You are a CAD assistant.");
    }

    #[test]
    fn memories_are_appended_as_a_section() {
        let memories = vec![RecalledMemory {
            content: "user prefers metric units".to_string(),
            source: "bundle".to_string(),
            memory_type: "fact".to_string(),
            metadata: serde_json::json!({}),
        }];
        let prompt = build_system_prompt("You are a CAD assistant.", &memories);
        assert!(prompt.contains("## Relevant Memory"));
        assert!(prompt.contains("user prefers metric units"));
    }

    #[test]
    fn template_renders_with_handlebars_data() {
        let template = PromptTemplate::new("greeting", "Hello, {{name}}!").unwrap();
        let rendered = template.render(&serde_json::json!({"name": "Ada"})).unwrap();
        assert_eq!(rendered, "Hello, Ada!");
    }
}
