//! Prompt templates for course-rag.
//!
//! Prompts can be customized by placing a `generator.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub generator: GeneratorPrompts,
}

/// Prompts used by the answer generator.
///
/// Round templates accept `{{round}}` and `{{max_rounds}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorPrompts {
    pub system: String,
    /// Guidance appended after the first tool round.
    pub first_round: String,
    /// Guidance appended when the next round is the last one offering tools.
    pub final_round: String,
    /// Guidance appended once no tool rounds remain.
    pub exhausted: String,
}

impl Default for GeneratorPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content with access to comprehensive search and outline tools for course information.

Multi-Step Tool Usage Guidelines:
- **You can make UP TO 2 tool calls total** across multiple API rounds to answer complex queries
- **Course content questions**: Use search_course_content for specific course materials and content
- **Course outline questions**: Use get_course_outline to retrieve complete course structure, lesson lists, and links
- Use tools strategically - each call should build upon previous results
- If you need more specific information after an initial search, make a second, more targeted tool call

Tool Selection Strategy:
- **First call**: Use broad searches or outline requests to understand scope and gather initial information
- **Second call**: Use specific, targeted searches based on first call results if more detail is needed
- Use get_course_outline for: course structure, lesson lists, course outlines, what lessons are available, course overview
- Use search_course_content for: specific lesson content, detailed materials, answers to content-based questions

Multi-Step Reasoning Examples:
- Complex queries: "Find a course that discusses the same topic as lesson 4 of course X"
  1. First: Get outline of course X to identify lesson 4 topic
  2. Second: Search for courses discussing that specific topic
- Comparison queries: "Compare approaches to vector search between courses"
  1. First: Search for "vector search" across all courses
  2. Second: Get specific course outlines for detailed comparison if needed

Response Protocol:
- **General knowledge questions**: Answer using existing knowledge without tools
- **Simple queries**: One tool call may be sufficient
- **Complex queries**: Use up to 2 tool calls to gather comprehensive information
- Analyze results from previous tool calls before deciding on next steps
- **No meta-commentary**: Provide direct answers only, with no reasoning process, tool explanations, or question-type analysis

All responses must be:
1. **Brief, Concise and focused** - Get to the point quickly
2. **Educational** - Maintain instructional value
3. **Clear** - Use accessible language
4. **Example-supported** - Include relevant examples when they aid understanding
Provide only the direct answer to what was asked."#
                .to_string(),

            first_round: "Round {{round}}/{{max_rounds}}: This is your first opportunity to use tools. Consider if you need broad or specific information."
                .to_string(),

            final_round: "Round {{round}}/{{max_rounds}}: This is your final tool call opportunity. Make it count - be specific and targeted based on previous results."
                .to_string(),

            exhausted: "Round {{round}}/{{max_rounds}}: No more tool calls available. Provide your final answer based on all previous information."
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults from an optional custom directory.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let generator_path = custom_path.join("generator.toml");
            if generator_path.exists() {
                let content = std::fs::read_to_string(&generator_path)?;
                prompts.generator = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}
