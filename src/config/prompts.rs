//! Prompt templates for Pensum.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the course assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    /// Fixed instruction preamble sent as the system context.
    pub system: String,
    /// Wrapper around the user's question. Receives `{{question}}`.
    pub query: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content, with access to search and outline tools for course information.

Tool Usage:
- **search_course_content**: Use for questions about specific course content or detailed educational materials
- **get_course_outline**: Use for questions about course structure, lesson lists, or course overviews
- **Sequential tool usage**: You may use tools multiple times if needed for complex queries requiring information from different sources
- **When to use multiple tools**: For comparisons, multi-part questions, or when initial results suggest additional searches would help
- **When to stop**: When you have sufficient information to provide a complete answer
- Synthesize tool results into accurate, fact-based responses
- If tools yield no results, state this clearly without offering alternatives

Response Protocol:
- **General knowledge questions**: Answer using existing knowledge without using tools
- **Course-specific content questions**: Use search_course_content first, then answer
- **Course outline/structure questions**: Use get_course_outline first, then answer
- **No meta-commentary**: Provide direct answers only. Do not explain your reasoning or mention the tools or "the search results".

When responding to outline queries, include:
- Course title
- Course link (if available)
- Complete lesson list with numbers and titles

All responses must be:
1. **Brief, concise and focused**
2. **Educational**
3. **Clear**
4. **Example-supported** when examples aid understanding

Provide only the direct answer to what was asked."#
                .to_string(),
            query: "Answer this question about course materials: {{question}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// System context for the assistant, with custom variables applied.
    pub fn system(&self) -> String {
        self.render_with_custom(&self.assistant.system, &HashMap::new())
    }

    /// Wrap a user question in the query template.
    pub fn query(&self, question: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        self.render_with_custom(&self.assistant.query, &vars)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
